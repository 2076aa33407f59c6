//! Listing and metadata types shared between providers and the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file as reported by a provider listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute provider path, display case preserved.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, UTC.
    pub modified: DateTime<Utc>,
    /// Provider-computed content hash, when the backend supports one.
    pub content_hash: Option<String>,
}

impl FileEntry {
    /// Final path component.
    pub fn name(&self) -> &str {
        crate::path::name(&self.path)
    }
}

/// A folder reference in a provider listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    pub path: String,
}

impl FolderRef {
    pub fn name(&self) -> &str {
        crate::path::name(&self.path)
    }
}

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    File(FileEntry),
    Folder(FolderRef),
}

/// One page of a folder listing.
///
/// A folder is only considered listed once pages have been consumed until
/// `cursor` comes back `None`.
#[derive(Debug, Clone)]
pub struct Page {
    pub entries: Vec<Entry>,
    /// Opaque continuation token; `None` means the listing is complete.
    pub cursor: Option<String>,
}

/// Capability flags a provider advertises.
///
/// Callers branch on these flags, never on the concrete provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Deletions can be routed to a recoverable trash/archive location.
    pub supports_trash: bool,
    /// Listings carry a content hash usable for equality checks.
    pub supports_hash: bool,
}
