//! FileProvider trait

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Capabilities, Entry, Page};

/// Uniform virtual-file-system capability consumed by the core.
///
/// Implementations wrap a concrete backend (cloud API, SFTP, local disk).
/// All paths are provider-normalized (`/`-rooted, no trailing slash); see
/// [`crate::path`].
#[async_trait]
pub trait FileProvider: Send + Sync {
    /// Capability flags for this backend.
    fn capabilities(&self) -> Capabilities;

    /// List the direct children of a folder, one page at a time.
    ///
    /// Pass `None` to start a listing and the returned cursor to continue
    /// it. The listing is complete when [`Page::cursor`] is `None`.
    async fn list_children(&self, path: &str, cursor: Option<&str>) -> Result<Page>;

    /// Metadata for a single path.
    async fn get_metadata(&self, path: &str) -> Result<Entry>;

    /// Delete a file or folder (with its contents).
    ///
    /// With `soft` the item is moved to the backend's trash/archive; only
    /// valid when [`Capabilities::supports_trash`] is set.
    async fn delete(&self, path: &str, soft: bool) -> Result<()>;

    /// Copy a file within this provider.
    async fn copy(&self, src: &str, dst: &str) -> Result<()>;
}
