//! Provider path helpers.
//!
//! Provider paths are `/`-separated, always start with `/`, and never end
//! with one (the root itself is `/`). Comparisons are case-insensitive on
//! the canonical form, matching cloud stores that preserve display case
//! but treat paths case-insensitively.

/// Normalize a raw path into provider form.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Canonical (lowercased) form used for identity checks and cycle guards.
pub fn canonical(path: &str) -> String {
    normalize(path).to_lowercase()
}

/// Parent of a path; the root is its own parent.
pub fn parent(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Final component of a path; empty for the root.
pub fn name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Join a child name onto a base path.
pub fn join(base: &str, child: &str) -> String {
    if base == "/" {
        format!("/{child}")
    } else {
        format!("{base}/{child}")
    }
}

/// Depth of a path: the root is 0, `/a` is 1, `/a/b` is 2.
pub fn depth(path: &str) -> usize {
    if path == "/" {
        0
    } else {
        path.matches('/').count()
    }
}

/// Path relative to `root`, without a leading slash. Returns `None` when
/// the path is not under `root`. Comparison is case-insensitive.
pub fn relative_to<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    if root == "/" {
        return Some(path.strip_prefix('/').unwrap_or(path));
    }
    let root_lower = root.to_lowercase();
    let path_lower = path.to_lowercase();
    if path_lower == root_lower {
        return Some("");
    }
    if path_lower.starts_with(&root_lower)
        && path.as_bytes().get(root.len()) == Some(&b'/')
    {
        Some(&path[root.len() + 1..])
    } else {
        None
    }
}
