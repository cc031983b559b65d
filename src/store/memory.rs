//! In-memory store for tests and embedded use.

use super::Store;
use crate::error::StoreResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// HashMap-backed store with the same contract as [`super::SqliteStore`].
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, Value>>,
    keys: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document directly, without going through the async API.
    pub fn seed(&self, path: &str, value: Value) {
        self.docs.lock().unwrap().insert(path.to_string(), value);
    }

    /// Register an API key directly.
    pub fn seed_key(&self, key: &str) {
        self.keys.lock().unwrap().insert(key.to_string());
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_value(&self, path: &str) -> StoreResult<Option<Value>> {
        Ok(self.docs.lock().unwrap().get(path).cloned())
    }

    async fn set_value(&self, path: &str, value: &Value) -> StoreResult<()> {
        self.docs
            .lock()
            .unwrap()
            .insert(path.to_string(), value.clone());
        Ok(())
    }

    async fn delete_value(&self, path: &str) -> StoreResult<bool> {
        Ok(self.docs.lock().unwrap().remove(path).is_some())
    }

    async fn is_authorized(&self, key: &str) -> StoreResult<bool> {
        Ok(self.keys.lock().unwrap().contains(key))
    }

    async fn create_key(&self, key: &str) -> StoreResult<()> {
        self.keys.lock().unwrap().insert(key.to_string());
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> StoreResult<bool> {
        Ok(self.keys.lock().unwrap().remove(key))
    }
}
