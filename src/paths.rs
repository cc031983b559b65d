//! Dot-delimited configuration path grammar.
//!
//! Paths address documents in the store. An *absolute* path starts with a
//! separator and names its environment in the first segment
//! (`.prod.service.db`); a *relative* path (`service.db`) is resolved by
//! prefixing the environment of the in-flight request. The reserved `*`
//! environment holds catch-all documents used as a fallback when no
//! environment-specific document exists.
//!
//! Everything in this module is pure string manipulation. No I/O.

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Reserved environment segment for catch-all documents.
pub const WILDCARD: &str = "*";

/// Qualify a path against an environment.
///
/// Relative paths are prefixed with `.{environment}`; absolute paths are
/// returned unchanged. Relative paths always qualify against the
/// environment of the top-level request, never the environment of an
/// intermediate extend target.
pub fn qualify(path: &str, environment: &str) -> String {
    if path.starts_with(SEPARATOR) {
        path.to_string()
    } else {
        format!(".{environment}.{path}")
    }
}

/// Derive the catch-all variant of an absolute path by replacing its
/// environment segment with [`WILDCARD`].
///
/// Returns `None` when the input is not absolute or is already the
/// catch-all path (so callers never fall back to a lookup they just did).
pub fn wildcard_of(absolute: &str) -> Option<String> {
    let rest = absolute.strip_prefix(SEPARATOR)?;
    let candidate = match rest.split_once(SEPARATOR) {
        Some((_environment, tail)) => format!(".{WILDCARD}.{tail}"),
        None => format!(".{WILDCARD}"),
    };
    if candidate == absolute {
        None
    } else {
        Some(candidate)
    }
}

/// Translate the remainder of a `/conf/...` URL into an absolute config
/// path: slashes become separators and a leading separator is added.
///
/// Returns `None` for an empty path or a path with empty segments
/// (`/conf//x`), which the HTTP layer maps to a bad request.
pub fn path_from_url(url_rest: &str) -> Option<String> {
    let trimmed = url_rest.trim_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(str::is_empty) {
        return None;
    }
    Some(format!(".{}", trimmed.replace('/', ".")))
}

/// Split an absolute path into its environment and the remaining relative
/// path. Returns `None` when there is no non-empty remainder; a bare
/// environment is not a readable location.
pub fn split_environment(absolute: &str) -> Option<(&str, &str)> {
    let rest = absolute.strip_prefix(SEPARATOR)?;
    let (environment, tail) = rest.split_once(SEPARATOR)?;
    if environment.is_empty() || tail.is_empty() {
        return None;
    }
    Some((environment, tail))
}
