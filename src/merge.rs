//! Deep merge over JSON documents.
//!
//! Used in two places: layering an `__override` fragment on top of a
//! resolved extend target, and layering configuration tiers during
//! startup. Objects merge key-by-key with the overlay winning; arrays and
//! scalars are replaced wholesale; a `null` overlay leaves the base value
//! in place (null means "not specified").

use serde_json::Value;

/// Merge `overlay` onto `base`, with overlay keys taking precedence.
///
/// # Example
/// ```
/// use serde_json::json;
/// use confserve::merge::deep_merge;
///
/// let target = json!({ "host": "db1", "pool": { "size": 8 } });
/// let fragment = json!({ "pool": { "size": 32 }, "port": 5432 });
/// let merged = deep_merge(target, fragment);
/// assert_eq!(merged, json!({ "host": "db1", "pool": { "size": 32 }, "port": 5432 }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold [`deep_merge`] over a sequence of values, later values winning.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
