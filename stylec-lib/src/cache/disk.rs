//! Token tables persisted under `<cache_dir>/<namespace>/`, one JSON record per key.
//!
//! Assignment of a new token happens while holding `<namespace>/.lock`, which is created
//! with `create_new` so only one process (or thread) can hold it. Records are written to
//! a `.tmp` file first and renamed into place, so readers never see a partial record.
//!
//! A lock whose owner has died, or that is older than the stale threshold, is removed by
//! the next build that wants it. `clear` bumps `<namespace>/.epoch`; handles compare it
//! against the epoch their memoized records were read at before trusting them.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::{info, trace, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const LOCK_FILE: &str = ".lock";
const EPOCH_FILE: &str = ".epoch";
const LOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const LOCK_STALE_AFTER: Duration = Duration::from_secs(8);
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    key: String,
    token: String,
    seq: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct LockFileContents {
    pid: u32,
    #[serde(default)]
    started_at: u64,
}

/// Removes the lock file when the critical section ends.
struct NamespaceLock {
    path: PathBuf,
}

impl Drop for NamespaceLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Records already read from disk, valid for as long as the namespace epoch matches.
#[derive(Debug, Default)]
struct Memo {
    epoch: u64,
    tokens: IndexMap<String, String>,
}

#[derive(Debug)]
pub struct DiskStore {
    namespace: String,
    dir: PathBuf,
    memo: Mutex<Memo>,
    lock_timeout: Duration,
    lock_stale_after: Duration,
}

impl DiskStore {
    pub fn open(cache_dir: &Path, namespace: &str) -> Self {
        DiskStore {
            namespace: namespace.to_string(),
            dir: cache_dir.join(namespace),
            memo: Mutex::new(Memo::default()),
            lock_timeout: LOCK_WAIT_TIMEOUT,
            lock_stale_after: LOCK_STALE_AFTER,
        }
    }

    /// How long to wait for another build holding the namespace lock.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Age after which a lock is treated as abandoned and removed.
    pub fn with_lock_stale_after(mut self, stale_after: Duration) -> Self {
        self.lock_stale_after = stale_after;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn fetch<F>(&self, key: &str, compute: F) -> Result<String>
    where
        F: FnOnce(&[String]) -> String,
    {
        let epoch = self.read_epoch()?;
        {
            let mut memo = self.memo.lock();
            if memo.epoch != epoch {
                trace!(
                    "disk cache `{}` was cleared, forgetting {} memoized names",
                    self.namespace,
                    memo.tokens.len()
                );
                memo.tokens.clear();
                memo.epoch = epoch;
            }
            if let Some(token) = memo.tokens.get(key) {
                trace!("disk cache `{}` hit: {} -> {}", self.namespace, key, token);
                return Ok(token.clone());
            }
        }

        let _lock = self.acquire_lock()?;
        let mut memo = self.memo.lock();
        memo.epoch = self.read_epoch()?;
        memo.tokens = self
            .load_records()?
            .into_iter()
            .map(|record| (record.key, record.token))
            .collect();

        if let Some(token) = memo.tokens.get(key) {
            trace!("disk cache `{}` reloaded: {} -> {}", self.namespace, key, token);
            return Ok(token.clone());
        }

        let keys: Vec<String> = memo.tokens.keys().cloned().collect();
        let record = Record {
            key: key.to_string(),
            token: compute(&keys),
            seq: keys.len(),
        };
        self.write_record(&record)?;
        trace!(
            "disk cache `{}` assigned: {} -> {}",
            self.namespace,
            record.key,
            record.token
        );

        memo.tokens.insert(record.key, record.token.clone());
        Ok(record.token)
    }

    pub fn clear(&self) -> Result<()> {
        if !self.dir.exists() {
            self.memo.lock().tokens.clear();
            return Ok(());
        }

        let _lock = self.acquire_lock()?;
        let mut removed = 0;
        for path in self.record_paths()? {
            fs::remove_file(&path).map_err(|e| Error::cache(&path, e))?;
            removed += 1;
        }
        let epoch = self.read_epoch()?.wrapping_add(1);
        self.write_epoch(epoch)?;

        let mut memo = self.memo.lock();
        memo.tokens.clear();
        memo.epoch = epoch;
        info!(
            "cleared {} cached class names from {}",
            removed,
            self.dir.display()
        );
        Ok(())
    }

    /// Number of records on disk.
    pub fn len(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }
        Ok(self.record_paths()?.len())
    }

    fn acquire_lock(&self) -> Result<NamespaceLock> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::cache(&self.dir, e))?;

        let lock_path = self.dir.join(LOCK_FILE);
        let deadline = Instant::now() + self.lock_timeout;

        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let lock = NamespaceLock {
                        path: lock_path.clone(),
                    };
                    let contents = LockFileContents {
                        pid: std::process::id(),
                        started_at: now_seconds(),
                    };
                    let serialized = serde_json::to_vec(&contents).map_err(|e| {
                        Error::cache(&lock.path, io::Error::new(ErrorKind::InvalidData, e))
                    })?;
                    file.write_all(&serialized)
                        .map_err(|e| Error::cache(&lock.path, e))?;
                    return Ok(lock);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    if self.lock_is_stale(&lock_path) && clear_lock_file(&lock_path) {
                        warn!("removed stale cache lock {}", lock_path.display());
                        continue;
                    }
                    if Instant::now() >= deadline {
                        let source = io::Error::new(
                            ErrorKind::TimedOut,
                            "timed out waiting for the cache lock held by another build",
                        );
                        return Err(Error::cache(lock_path, source));
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(err) => return Err(Error::cache(lock_path, err)),
            }
        }
    }

    /// A lock is stale when it is older than `lock_stale_after` or its owner is gone.
    /// A lock whose contents cannot be read yet is only judged by its age.
    fn lock_is_stale(&self, lock_path: &Path) -> bool {
        let meta_age = fs::metadata(lock_path)
            .ok()
            .and_then(|meta| lock_age_from_metadata(&meta));
        if meta_age.is_some_and(|age| age > self.lock_stale_after) {
            return true;
        }

        let contents = fs::read(lock_path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<LockFileContents>(&bytes).ok());
        let Some(contents) = contents else {
            return false;
        };
        if pid_is_alive(contents.pid) == Some(false) {
            return true;
        }
        meta_age.is_none()
            && Duration::from_secs(now_seconds().saturating_sub(contents.started_at))
                > self.lock_stale_after
    }

    fn read_epoch(&self) -> Result<u64> {
        let path = self.dir.join(EPOCH_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => text
                .trim()
                .parse()
                .map_err(|e| Error::cache(&path, io::Error::new(ErrorKind::InvalidData, e))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
            Err(err) => Err(Error::cache(path, err)),
        }
    }

    fn write_epoch(&self, epoch: u64) -> Result<()> {
        let path = self.dir.join(EPOCH_FILE);
        let tmp = self.dir.join(format!("{}.tmp", EPOCH_FILE));
        fs::write(&tmp, epoch.to_string()).map_err(|e| Error::cache(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Error::cache(&path, e))
    }

    fn record_paths(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| Error::cache(&self.dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::cache(&self.dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    fn load_records(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for path in self.record_paths()? {
            let json = fs::read_to_string(&path).map_err(|e| Error::cache(&path, e))?;
            let record: Record = serde_json::from_str(&json)
                .map_err(|e| Error::cache(&path, io::Error::new(ErrorKind::InvalidData, e)))?;
            records.push(record);
        }
        records.sort_by_key(|record| record.seq);
        Ok(records)
    }

    fn write_record(&self, record: &Record) -> Result<()> {
        let path = self.dir.join(format!("{:08}.json", record.seq));
        let tmp = self.dir.join(format!("{:08}.json.tmp", record.seq));
        if path.exists() {
            let source = io::Error::new(
                ErrorKind::AlreadyExists,
                "a record with this sequence number already exists",
            );
            return Err(Error::cache(path, source));
        }

        let json = serde_json::to_vec(record)
            .map_err(|e| Error::cache(&tmp, io::Error::new(ErrorKind::InvalidData, e)))?;
        fs::write(&tmp, json).map_err(|e| Error::cache(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Error::cache(&path, e))
    }
}

fn lock_age_from_metadata(meta: &fs::Metadata) -> Option<Duration> {
    meta.modified()
        .or_else(|_| meta.created())
        .ok()
        .and_then(|time| SystemTime::now().duration_since(time).ok())
}

/// True when the lock is gone afterwards, whoever removed it.
fn clear_lock_file(lock_path: &Path) -> bool {
    match fs::remove_file(lock_path) {
        Ok(()) => true,
        Err(err) => err.kind() == ErrorKind::NotFound,
    }
}

fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(unix)]
fn pid_is_alive(pid: u32) -> Option<bool> {
    // `kill(0)` signals the whole process group.
    if pid == 0 || pid > i32::MAX as u32 {
        return None;
    }

    // SAFETY: signal 0 only checks whether the process exists.
    let result = unsafe { libc::kill(pid as i32, 0) };
    if result == 0 {
        return Some(true);
    }
    match io::Error::last_os_error().raw_os_error() {
        Some(code) if code == libc::ESRCH => Some(false),
        Some(code) if code == libc::EPERM => Some(true),
        _ => None,
    }
}

#[cfg(not(unix))]
fn pid_is_alive(_pid: u32) -> Option<bool> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn counter(keys: &[String]) -> String {
        format!("t{}", keys.len())
    }

    fn write_lock(store: &DiskStore, pid: u32) {
        fs::create_dir_all(store.dir()).unwrap();
        let contents = LockFileContents {
            pid,
            started_at: now_seconds(),
        };
        fs::write(
            store.dir().join(LOCK_FILE),
            serde_json::to_vec(&contents).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_assignments_survive_a_fresh_handle() {
        let tmp = tempfile::tempdir().unwrap();

        let first = DiskStore::open(tmp.path(), "classnames");
        assert_eq!(first.fetch("a", counter).unwrap(), "t0");
        assert_eq!(first.fetch("b", counter).unwrap(), "t1");

        let second = DiskStore::open(tmp.path(), "classnames");
        assert_eq!(second.fetch("b", counter).unwrap(), "t1");
        assert_eq!(second.fetch("c", counter).unwrap(), "t2");
        assert_eq!(second.len().unwrap(), 3);
    }

    #[test]
    fn test_handle_sees_keys_written_by_another_handle() {
        let tmp = tempfile::tempdir().unwrap();
        let first = DiskStore::open(tmp.path(), "classnames");
        let second = DiskStore::open(tmp.path(), "classnames");

        assert_eq!(first.fetch("a", counter).unwrap(), "t0");
        // `second` has never seen "a" but must not hand out t0 again.
        assert_eq!(second.fetch("b", counter).unwrap(), "t1");
        assert_eq!(first.fetch("b", counter).unwrap(), "t1");
    }

    #[test]
    fn test_lock_is_released_after_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::open(tmp.path(), "classnames");
        store.fetch("a", counter).unwrap();
        assert!(!store.dir().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_held_lock_times_out_as_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::open(tmp.path(), "classnames")
            .with_lock_timeout(Duration::from_millis(50));
        write_lock(&store, std::process::id());

        let err = store.fetch("a", counter).unwrap_err();
        assert!(matches!(err, Error::CacheStorage { .. }));
        assert!(store.dir().join(LOCK_FILE).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_of_dead_process_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::open(tmp.path(), "classnames")
            .with_lock_timeout(Duration::from_millis(50));
        // Above any pid_max, so no such process exists.
        write_lock(&store, i32::MAX as u32);

        assert_eq!(store.fetch("a", counter).unwrap(), "t0");
        assert!(!store.dir().join(LOCK_FILE).exists());

        write_lock(&store, i32::MAX as u32);
        store.clear().unwrap();
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_old_lock_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::open(tmp.path(), "classnames")
            .with_lock_timeout(Duration::from_millis(500))
            .with_lock_stale_after(Duration::from_millis(10));
        write_lock(&store, std::process::id());
        thread::sleep(Duration::from_millis(50));

        assert_eq!(store.fetch("a", counter).unwrap(), "t0");
    }

    #[test]
    fn test_lock_file_names_its_owner() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::open(tmp.path(), "classnames");

        let lock = store.acquire_lock().unwrap();
        let contents: LockFileContents =
            serde_json::from_slice(&fs::read(&lock.path).unwrap()).unwrap();
        assert_eq!(contents.pid, std::process::id());
        assert!(contents.started_at > 0);

        drop(lock);
        assert!(!store.dir().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_clear_from_another_handle_invalidates_memo() {
        let tmp = tempfile::tempdir().unwrap();
        let first = DiskStore::open(tmp.path(), "classnames");
        let second = DiskStore::open(tmp.path(), "classnames");

        assert_eq!(first.fetch("a", counter).unwrap(), "t0");
        second.clear().unwrap();
        assert_eq!(second.fetch("b", counter).unwrap(), "t0");

        // `first` memoized a -> t0 before the clear; t0 now belongs to b.
        assert_eq!(first.fetch("a", counter).unwrap(), "t1");
        assert_eq!(first.fetch("b", counter).unwrap(), "t0");
        assert_eq!(second.fetch("a", counter).unwrap(), "t1");
    }

    #[test]
    fn test_corrupt_epoch_is_a_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::open(tmp.path(), "classnames");
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join(EPOCH_FILE), b"many").unwrap();

        let err = store.fetch("a", counter).unwrap_err();
        assert!(matches!(err, Error::CacheStorage { .. }));
    }

    #[test]
    fn test_clear_removes_records() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::open(tmp.path(), "classnames");
        store.fetch("a", counter).unwrap();
        store.fetch("b", counter).unwrap();

        store.clear().unwrap();

        assert_eq!(store.len().unwrap(), 0);
        assert_eq!(store.fetch("b", counter).unwrap(), "t0");
    }

    #[test]
    fn test_corrupt_record_is_a_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::open(tmp.path(), "classnames");
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join("00000000.json"), b"not json").unwrap();

        let err = store.fetch("a", counter).unwrap_err();
        assert!(matches!(err, Error::CacheStorage { .. }));
    }

    #[test]
    fn test_unwritable_cache_dir_is_a_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        fs::write(&file, b"").unwrap();

        let store = DiskStore::open(&file, "classnames");
        let err = store.fetch("a", counter).unwrap_err();
        assert!(matches!(err, Error::CacheStorage { .. }));
    }
}
