// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Canonical path handling.
//!
//! Paths are `/`-separated with a leading slash, no empty segments, and no
//! trailing slash; `/` is the unique root form. Every public path-taking
//! entry point in the mirror normalizes before use.

/// Canonicalize a path: split on `/`, drop empty segments, rejoin.
///
/// `""` and `"/"` both map to `"/"`.
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(seg);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Parent of a path, normalized. Returns `None` for the root.
pub fn parent(path: &str) -> Option<String> {
    let norm = normalize(path);
    if norm == "/" {
        return None;
    }
    match norm.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(norm[..idx].to_string()),
        // A normalized non-root path always contains a slash.
        None => None,
    }
}

/// Join a base path and a suffix, normalized.
pub fn join(base: &str, rest: &str) -> String {
    normalize(&format!("{base}/{rest}"))
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
