//! Per-request cycle-detection state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Tracks which absolute paths have already been visited during one
/// top-level resolution, including every extend expansion it triggers.
///
/// A fresh context is created per top-level request and shared (cheap
/// clone) across all concurrent sub-resolutions of that request. It has
/// no life beyond the request.
#[derive(Clone, Default)]
pub struct ResolveContext {
    seen: Arc<Mutex<HashSet<String>>>,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` as visited. Returns `false` if it was already seen.
    ///
    /// The check and the insert are a single operation under the lock, so
    /// two sibling sub-resolutions racing on the same path cannot both
    /// observe "not yet visited".
    pub fn mark(&self, path: &str) -> bool {
        self.seen.lock().unwrap().insert(path.to_string())
    }
}
