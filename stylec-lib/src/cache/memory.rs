//! Process-wide in-memory token tables, one per namespace.

use crate::error::Result;
use indexmap::IndexMap;
use log::trace;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type Table = Arc<Mutex<IndexMap<String, String>>>;

/// Every in-memory namespace created by this process. Tables live until exit.
static TABLES: Lazy<Mutex<HashMap<String, Table>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Handle onto one namespace's table. Handles for the same namespace share state.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    namespace: String,
    table: Table,
}

impl MemoryStore {
    pub fn open(namespace: &str) -> Self {
        let table = TABLES
            .lock()
            .entry(namespace.to_string())
            .or_default()
            .clone();
        MemoryStore {
            namespace: namespace.to_string(),
            table,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn fetch<F>(&self, key: &str, compute: F) -> Result<String>
    where
        F: FnOnce(&[String]) -> String,
    {
        let mut table = self.table.lock();
        if let Some(token) = table.get(key) {
            trace!("memory cache `{}` hit: {} -> {}", self.namespace, key, token);
            return Ok(token.clone());
        }

        let keys: Vec<String> = table.keys().cloned().collect();
        let token = compute(&keys);
        trace!("memory cache `{}` assigned: {} -> {}", self.namespace, key, token);
        table.insert(key.to_string(), token.clone());
        Ok(token)
    }

    pub fn clear(&self) -> Result<()> {
        self.table.lock().clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
