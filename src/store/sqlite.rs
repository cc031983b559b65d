//! SQLite-backed store.

use super::{Store, now_ms};
use crate::error::StoreResult;
use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Store handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent access
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.run_migrations()?;

        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.run_migrations()?;

        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    /// Execute a function with exclusive access to the connection.
    fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_value(&self, path: &str) -> StoreResult<Option<Value>> {
        self.with_conn(|conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM config_docs WHERE path = ?1",
                    params![path],
                    |row| row.get(0),
                )
                .optional()?;

            match body {
                Some(body) => {
                    let value = serde_json::from_str(&body)?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        })
    }

    async fn set_value(&self, path: &str, value: &Value) -> StoreResult<()> {
        let body = serde_json::to_string(value)?;
        let now = now_ms();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO config_docs (path, body, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(path) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![path, body, now],
            )?;
            Ok(())
        })
    }

    async fn delete_value(&self, path: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM config_docs WHERE path = ?1", params![path])?;
            Ok(deleted > 0)
        })
    }

    async fn is_authorized(&self, key: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM api_keys WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    async fn create_key(&self, key: &str) -> StoreResult<()> {
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO api_keys (key, created_at) VALUES (?1, ?2)",
                params![key, now],
            )?;
            Ok(())
        })
    }

    async fn delete_key(&self, key: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM api_keys WHERE key = ?1", params![key])?;
            Ok(deleted > 0)
        })
    }
}
