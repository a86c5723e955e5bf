//! Exactly-once token assignment per key, scoped by a namespace.
//!
//! A [`NameCache`] is an explicit handle: build one per pipeline invocation (or share one
//! across threads) and pass it to every call that may compress class names.

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::options::Options;
use std::path::Path;

/// Namespace used for compressed class names.
pub const CLASS_NAMES_NAMESPACE: &str = "classnames";

#[derive(Debug)]
pub enum NameCache {
    Memory(MemoryStore),
    Disk(DiskStore),
}

impl NameCache {
    pub fn in_memory(namespace: &str) -> Self {
        NameCache::Memory(MemoryStore::open(namespace))
    }

    pub fn on_disk(cache_dir: &Path, namespace: &str) -> Self {
        NameCache::Disk(DiskStore::open(cache_dir, namespace))
    }

    /// The class-name cache selected by `cacheDir`.
    pub fn for_options(options: &Options) -> Self {
        match &options.cache_dir {
            Some(dir) => NameCache::on_disk(dir, CLASS_NAMES_NAMESPACE),
            None => NameCache::in_memory(CLASS_NAMES_NAMESPACE),
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            NameCache::Memory(store) => store.namespace(),
            NameCache::Disk(store) => store.namespace(),
        }
    }

    /// Return the token assigned to `key`, assigning `compute(existing_keys)` first if
    /// there is none yet. `existing_keys` is in insertion order.
    pub fn fetch<F>(&self, key: &str, compute: F) -> Result<String>
    where
        F: FnOnce(&[String]) -> String,
    {
        match self {
            NameCache::Memory(store) => store.fetch(key, compute),
            NameCache::Disk(store) => store.fetch(key, compute),
        }
    }

    pub fn clear(&self) -> Result<()> {
        match self {
            NameCache::Memory(store) => store.clear(),
            NameCache::Disk(store) => store.clear(),
        }
    }
}

/// Clear the class-name cache `options` selects.
pub fn clear_cache(options: &Options) -> Result<()> {
    NameCache::for_options(options).clear()
}
