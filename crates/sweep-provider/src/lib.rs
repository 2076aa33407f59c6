//! Virtual file system provider contract for vfs-sweep.
//!
//! Defines the uniform capability-tagged interface the core consumes
//! (list, metadata, delete, copy) plus the listing types and the
//! transient/permanent error taxonomy. Concrete cloud bindings live
//! outside this workspace; [`MemoryProvider`] is the in-tree provider
//! used by the test suites.

pub mod error;
pub mod memory;
pub mod path;
pub mod provider;
pub mod types;

pub use error::{ProviderError, Result};
pub use memory::MemoryProvider;
pub use provider::FileProvider;
pub use types::{Capabilities, Entry, FileEntry, FolderRef, Page};
