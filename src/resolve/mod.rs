//! Configuration resolution engine.
//!
//! Turns a requested path + environment into a fully materialized value:
//! exact-path lookup with wildcard fallback, then extend expansion (see
//! [`expand`]). The engine is stateless between top-level calls; the only
//! per-request state is the [`ResolveContext`] cycle guard.

pub mod context;
pub mod expand;

pub use context::ResolveContext;

use crate::error::ResolveError;
use crate::paths;
use crate::store::Store;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default bound on end-to-end resolution latency.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

type ResolveOutcome = Result<Option<Value>, ResolveError>;
type BoxedResolve = Pin<Box<dyn Future<Output = ResolveOutcome> + Send>>;

/// Resolution engine holding its store dependency explicitly. Cheap to
/// clone; clones share the store handle.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    deadline: Duration,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Replace the resolution deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// The injected store handle.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Resolve `path` within `environment` to a fully expanded document.
    ///
    /// `Ok(None)` means the path (and its wildcard fallback, if any) has
    /// no stored value. The whole call, including every concurrent
    /// sub-resolution, is bounded by the engine deadline; on expiry the
    /// outstanding work is cancelled and [`ResolveError::Timeout`] is
    /// returned.
    pub async fn get_config(&self, path: &str, environment: &str) -> ResolveOutcome {
        let ctx = ResolveContext::new();
        let resolution = self.resolve(path.to_string(), environment.to_string(), ctx);
        match tokio::time::timeout(self.deadline, resolution).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ResolveError::Timeout),
        }
    }

    /// Store `value` at `path` verbatim. Writes bypass expansion; extend
    /// directives are only interpreted on read.
    pub async fn set_config(&self, path: &str, value: &Value) -> Result<(), ResolveError> {
        Ok(self.store.set_value(path, value).await?)
    }

    /// Delete the document at `path`. Returns whether one existed.
    pub async fn delete_config(&self, path: &str) -> Result<bool, ResolveError> {
        Ok(self.store.delete_value(path).await?)
    }

    /// One resolution step, re-entered recursively for extend targets.
    ///
    /// Boxed because the recursion flows through [`expand::expand`], which
    /// spawns this future for each directive it finds. Owned arguments
    /// keep the future `'static` so those spawns are possible.
    pub(crate) fn resolve(
        &self,
        path: String,
        environment: String,
        ctx: ResolveContext,
    ) -> BoxedResolve {
        let engine = self.clone();
        Box::pin(async move {
            let absolute = paths::qualify(&path, &environment);

            // Re-entering a path within one request is a reference cycle:
            // resolve to absent instead of recursing. Marking happens
            // before any fetch for this path is issued.
            if !ctx.mark(&absolute) {
                debug!(path = %absolute, "cycle detected, resolving to absent");
                return Ok(None);
            }

            let wildcard = paths::wildcard_of(&absolute);

            // A store failure on the exact path is terminal: failure is
            // not absence, and only absence falls back to the wildcard.
            let raw = match engine.store.get_value(&absolute).await? {
                Some(value) => Some(value),
                None => match wildcard {
                    Some(ref wild) => {
                        debug!(path = %absolute, fallback = %wild, "exact path absent, trying catch-all");
                        engine.store.get_value(wild).await?
                    }
                    None => None,
                },
            };

            match raw {
                Some(value) => Ok(Some(expand::expand(&engine, value, &environment, &ctx).await?)),
                None => Ok(None),
            }
        })
    }
}
