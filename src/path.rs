//! Storage path normalization.
//!
//! A slash-separated database path maps to a storage namespace (directory
//! segments joined with underscores) and a base name (trailing segment with
//! its extension stripped). The namespace groups a logical database file
//! under a shared storage pool.

/// Namespace used when the path carries no directory segments.
pub const DEFAULT_NAMESPACE: &str = "def";

/// Normalized storage coordinates for a database path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    pub namespace: String,
    pub base: String,
}

/// Normalize a slash-separated path into a [`StorageLocation`].
///
/// `/tmm/u_63/dev/common.sqlite` becomes namespace `tmm_u_63_dev` with base
/// `common`; a bare `/common.sqlite` falls back to the `def` namespace.
#[must_use]
pub fn normalize_storage_path(path: &str) -> StorageLocation {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let file = segments.pop().unwrap_or("");
    let base = match file.rfind('.') {
        Some(idx) => &file[..idx],
        None => file,
    };
    let namespace = if segments.is_empty() {
        DEFAULT_NAMESPACE.to_string()
    } else {
        segments.join("_")
    };
    StorageLocation {
        namespace,
        base: base.to_string(),
    }
}
