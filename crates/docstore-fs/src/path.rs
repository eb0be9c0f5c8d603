//! Conversion between path segments and remote entry names.
//!
//! Remote names may contain `/`, which would otherwise split a path. Such
//! slashes are shown as `／` (U+FF0F FULLWIDTH SOLIDUS) in paths. A remote
//! name that already contains `／` cannot be told apart from one with a real
//! slash after a round-trip.

/// Character that stands in for `/` inside a path segment.
pub const SLASH_SENTINEL: char = '\u{FF0F}';

/// Turn a remote name into a path segment.
pub fn encode_name(name: &str) -> String {
    name.replace('/', "\u{FF0F}")
}

/// Turn a path segment back into a remote name.
pub fn decode_name(segment: &str) -> String {
    segment.replace(SLASH_SENTINEL, "/")
}

/// Strip leading and trailing slashes.
pub fn trim_remote(path: &str) -> &str {
    path.trim_matches('/')
}

/// Split a path into its parent path and last segment.
///
/// `"a/b/c"` gives `("a/b", "c")`, `"c"` gives `("", "c")`.
pub fn split_remote(path: &str) -> (&str, &str) {
    let path = trim_remote(path);
    match path.rfind('/') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    }
}

/// Append a segment to a path.
pub fn join_remote(parent: &str, segment: &str) -> String {
    let parent = trim_remote(parent);
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{}", parent, segment)
    }
}

/// Non-empty segments of a path, in order.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    trim_remote(path).split('/').filter(|s| !s.is_empty())
}

/// The path with leading, trailing and repeated slashes removed.
pub fn normalize_remote(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("/")
}
