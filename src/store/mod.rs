//! Key-value store boundary.
//!
//! The engine addresses the store with fully-qualified absolute paths (or
//! their wildcard variants) as opaque keys. Record-type namespacing
//! (config documents vs. API keys) is the store's concern, not the
//! engine's.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreResult;
use async_trait::async_trait;
use serde_json::Value;

/// Persistence contract consumed by the resolution engine and the HTTP
/// layer. `get_value` distinguishes absence (`Ok(None)`) from failure
/// (`Err`); the engine's fallback logic depends on that distinction.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch the document stored at `path`, if any.
    async fn get_value(&self, path: &str) -> StoreResult<Option<Value>>;

    /// Store `value` at `path`, replacing any existing document.
    async fn set_value(&self, path: &str, value: &Value) -> StoreResult<()>;

    /// Delete the document at `path`. Returns whether one existed.
    async fn delete_value(&self, path: &str) -> StoreResult<bool>;

    /// Whether `key` is a known API key.
    async fn is_authorized(&self, key: &str) -> StoreResult<bool>;

    /// Register a new API key.
    async fn create_key(&self, key: &str) -> StoreResult<()>;

    /// Revoke an API key. Returns whether it existed.
    async fn delete_key(&self, key: &str) -> StoreResult<bool>;
}

/// Mint a fresh API key.
pub fn generate_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
