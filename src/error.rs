//! Error taxonomy for the resolution engine and store.
//!
//! Absence is not an error: read APIs return `Ok(None)` for a missing
//! path (and for a cycle-guarded sub-resolution). The variants here cover
//! genuine failures only. Only "key absent" falls back to the wildcard
//! path; a failing store never does.

use thiserror::Error;

/// Failures surfaced by a [`crate::store::Store`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store itself failed (I/O, connection, query).
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// A document could not be encoded to or decoded from its stored
    /// JSON representation.
    #[error("document serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Failures of a top-level resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A store lookup failed somewhere in the resolution tree. A single
    /// failing extend invalidates the whole document.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The resolution deadline elapsed before the document was fully
    /// expanded. Distinct from not-found.
    #[error("resolution deadline exceeded")]
    Timeout,

    /// A concurrent sub-resolution task was cancelled or panicked.
    #[error("sub-resolution task failed: {0}")]
    Join(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
