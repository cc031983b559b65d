//! Extend-directive expansion.
//!
//! A fetched document may embed directives of the form
//! `{"__extend": "<path>", "__override": {...}}`. Expansion walks the
//! document, resolves every directive's target through the engine (same
//! request context, so cycles are caught), deep-merges the optional
//! override fragment over the resolved target, and splices each result
//! back in place of its directive node. Independent directives resolve
//! concurrently.

use super::{Engine, ResolveContext};
use crate::error::ResolveError;
use crate::merge::deep_merge;
use serde_json::Value;
use tokio::task::JoinSet;

/// Reserved key naming the path whose resolved value replaces the node.
pub const EXTEND_KEY: &str = "__extend";

/// Reserved key holding a fragment merged over the resolved target.
pub const OVERRIDE_KEY: &str = "__override";

/// One step of a location path from the traversal root.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

/// A scheduled sub-resolution: where the result goes, which path it
/// extends, and the fragment merged over it.
struct ExtendJob {
    location: Vec<Step>,
    target: String,
    override_fragment: Option<Value>,
}

/// Expand every extend directive in `value`.
///
/// Scalars pass through unchanged. Sub-resolutions fan out concurrently
/// and fan in before the rewritten tree is returned; reassembly writes
/// each result at its recorded location, so completion order is
/// irrelevant. A sub-resolution that comes back absent (missing key or
/// cycle) leaves `null` at its location; a failing one fails the whole
/// expansion.
pub(crate) async fn expand(
    engine: &Engine,
    value: Value,
    environment: &str,
    ctx: &ResolveContext,
) -> Result<Value, ResolveError> {
    if !matches!(value, Value::Array(_) | Value::Object(_)) {
        return Ok(value);
    }

    let mut root = value;
    let jobs = collect_extend_jobs(&root);
    if jobs.is_empty() {
        return Ok(root);
    }

    let mut tasks: JoinSet<Result<(Vec<Step>, Value), ResolveError>> = JoinSet::new();
    for job in jobs {
        let engine = engine.clone();
        let environment = environment.to_string();
        let ctx = ctx.clone();
        tasks.spawn(async move {
            let resolved = engine.resolve(job.target, environment, ctx).await?;
            let replacement = match (resolved, job.override_fragment) {
                (Some(target), Some(fragment)) => deep_merge(target, fragment),
                (Some(target), None) => target,
                // Absent target: the directive location becomes null and
                // the rest of the document still resolves.
                (None, _) => Value::Null,
            };
            Ok((job.location, replacement))
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (location, replacement) = joined.map_err(|err| ResolveError::Join(err.to_string()))??;
        write_at(&mut root, &location, replacement);
    }

    Ok(root)
}

/// Depth-first worklist traversal collecting every directive with its
/// location. Does not descend into directive nodes; the directive's
/// target subtree is resolved on its own when the sub-resolution runs.
fn collect_extend_jobs(root: &Value) -> Vec<ExtendJob> {
    let mut jobs = Vec::new();
    let mut worklist: Vec<Vec<Step>> = vec![Vec::new()];

    while let Some(location) = worklist.pop() {
        match value_at(root, &location) {
            Value::Array(items) => {
                for index in 0..items.len() {
                    let mut child = location.clone();
                    child.push(Step::Index(index));
                    worklist.push(child);
                }
            }
            Value::Object(map) => {
                if let Some(target) = map.get(EXTEND_KEY).and_then(Value::as_str) {
                    jobs.push(ExtendJob {
                        location,
                        target: target.to_string(),
                        override_fragment: map.get(OVERRIDE_KEY).cloned(),
                    });
                } else {
                    for key in map.keys() {
                        let mut child = location.clone();
                        child.push(Step::Key(key.clone()));
                        worklist.push(child);
                    }
                }
            }
            _ => {}
        }
    }

    jobs
}

fn value_at<'a>(root: &'a Value, location: &[Step]) -> &'a Value {
    let mut node = root;
    for step in location {
        node = match step {
            Step::Key(key) => &node[key.as_str()],
            Step::Index(index) => &node[*index],
        };
    }
    node
}

fn write_at(root: &mut Value, location: &[Step], replacement: Value) {
    let mut node = root;
    for step in location {
        let next = match step {
            Step::Key(key) => node.get_mut(key.as_str()),
            Step::Index(index) => node.get_mut(*index),
        };
        match next {
            Some(child) => node = child,
            None => return,
        }
    }
    *node = replacement;
}
