//! In-memory provider used by the test suites.
//!
//! Backs the provider contract with plain maps behind a mutex, so tests can
//! mutate the tree between phases (e.g. drop a file into a folder after it
//! was scanned but before it is deleted), force paginated listings with a
//! small page size, and inject transient failures to exercise retry paths.
//! Every destructive call is journaled for assertions.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::error::{ProviderError, Result};
use crate::path;
use crate::provider::FileProvider;
use crate::types::{Capabilities, Entry, FileEntry, FolderRef, Page};

#[derive(Debug, Default)]
struct MemState {
    /// Canonical path -> display path.
    folders: BTreeMap<String, String>,
    /// Canonical path -> entry (display path kept inside the entry).
    files: BTreeMap<String, FileEntry>,
    /// Canonical path -> remaining transient failures for `list_children`.
    transient_failures: HashMap<String, u32>,
    deleted: Vec<String>,
    trashed: Vec<String>,
    copied: Vec<(String, String)>,
}

/// In-memory [`FileProvider`] implementation.
pub struct MemoryProvider {
    state: Mutex<MemState>,
    page_size: usize,
    capabilities: Capabilities,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemState::default()),
            page_size: 1000,
            capabilities: Capabilities {
                supports_trash: true,
                supports_hash: true,
            },
        }
    }

    /// Force listings to paginate with at most `page_size` entries per page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Register a folder, creating missing ancestors.
    pub fn add_folder(&self, raw: &str) {
        let display = path::normalize(raw);
        let mut state = self.state.lock().unwrap();
        let mut current = display.clone();
        while current != "/" {
            state
                .folders
                .entry(path::canonical(&current))
                .or_insert_with(|| current.clone());
            current = path::parent(&current);
        }
    }

    /// Register a file, creating its parent folders.
    pub fn add_file(&self, raw: &str, size: u64, modified_epoch: i64, hash: Option<&str>) {
        let display = path::normalize(raw);
        self.add_folder(&path::parent(&display));
        let entry = FileEntry {
            path: display.clone(),
            size,
            modified: epoch(modified_epoch),
            content_hash: hash.map(str::to_string),
        };
        let mut state = self.state.lock().unwrap();
        state.files.insert(path::canonical(&display), entry);
    }

    /// Remove a file without journaling (simulates out-of-band mutation).
    pub fn remove_file(&self, raw: &str) {
        let key = path::canonical(raw);
        self.state.lock().unwrap().files.remove(&key);
    }

    /// Make the next `count` `list_children` calls for `path` fail with a
    /// transient error.
    pub fn inject_transient(&self, raw: &str, count: u32) {
        let key = path::canonical(raw);
        self.state
            .lock()
            .unwrap()
            .transient_failures
            .insert(key, count);
    }

    /// Paths permanently deleted so far, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// Paths soft-deleted (moved to trash) so far, in call order.
    pub fn trashed(&self) -> Vec<String> {
        self.state.lock().unwrap().trashed.clone()
    }

    /// (src, dst) pairs copied so far.
    pub fn copied(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().copied.clone()
    }

    pub fn contains_folder(&self, raw: &str) -> bool {
        let key = path::canonical(raw);
        self.state.lock().unwrap().folders.contains_key(&key)
    }

    pub fn contains_file(&self, raw: &str) -> bool {
        let key = path::canonical(raw);
        self.state.lock().unwrap().files.contains_key(&key)
    }

    fn children_of(state: &MemState, parent_key: &str) -> Vec<Entry> {
        let mut entries: Vec<Entry> = Vec::new();
        for display in state.folders.values() {
            if path::canonical(&path::parent(display)) == parent_key {
                entries.push(Entry::Folder(FolderRef {
                    path: display.clone(),
                }));
            }
        }
        for entry in state.files.values() {
            if path::canonical(&path::parent(&entry.path)) == parent_key {
                entries.push(Entry::File(entry.clone()));
            }
        }
        entries.sort_by(|a, b| entry_path(a).cmp(entry_path(b)));
        entries
    }
}

fn entry_path(entry: &Entry) -> &str {
    match entry {
        Entry::File(f) => &f.path,
        Entry::Folder(f) => &f.path,
    }
}

fn epoch(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

#[async_trait]
impl FileProvider for MemoryProvider {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn list_children(&self, raw: &str, cursor: Option<&str>) -> Result<Page> {
        let key = path::canonical(raw);
        let mut state = self.state.lock().unwrap();

        if let Some(remaining) = state.transient_failures.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ProviderError::transient(raw, "injected failure"));
            }
        }

        if key != "/" && !state.folders.contains_key(&key) {
            return Err(ProviderError::not_found(raw));
        }

        let entries = Self::children_of(&state, &key);
        let offset: usize = cursor
            .map(|c| {
                c.parse()
                    .map_err(|_| ProviderError::permanent(raw, "invalid cursor"))
            })
            .transpose()?
            .unwrap_or(0);

        let end = (offset + self.page_size).min(entries.len());
        let next = if end < entries.len() {
            Some(end.to_string())
        } else {
            None
        };
        Ok(Page {
            entries: entries[offset..end].to_vec(),
            cursor: next,
        })
    }

    async fn get_metadata(&self, raw: &str) -> Result<Entry> {
        let key = path::canonical(raw);
        let state = self.state.lock().unwrap();
        if let Some(entry) = state.files.get(&key) {
            return Ok(Entry::File(entry.clone()));
        }
        if let Some(display) = state.folders.get(&key) {
            return Ok(Entry::Folder(FolderRef {
                path: display.clone(),
            }));
        }
        Err(ProviderError::not_found(raw))
    }

    async fn delete(&self, raw: &str, soft: bool) -> Result<()> {
        let key = path::canonical(raw);
        let mut state = self.state.lock().unwrap();
        let known =
            state.folders.contains_key(&key) || state.files.contains_key(&key);
        if !known {
            return Err(ProviderError::not_found(raw));
        }
        if soft && !self.capabilities.supports_trash {
            return Err(ProviderError::Unsupported {
                operation: "soft delete".to_string(),
            });
        }

        let subtree_prefix = format!("{key}/");
        state
            .folders
            .retain(|k, _| k != &key && !k.starts_with(&subtree_prefix));
        state
            .files
            .retain(|k, _| k != &key && !k.starts_with(&subtree_prefix));

        let display = path::normalize(raw);
        if soft {
            state.trashed.push(display);
        } else {
            state.deleted.push(display);
        }
        Ok(())
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let src_key = path::canonical(src);
        let dst_display = path::normalize(dst);
        let mut state = self.state.lock().unwrap();
        let Some(entry) = state.files.get(&src_key).cloned() else {
            return Err(ProviderError::not_found(src));
        };

        // Materialize parent folders of the destination.
        let mut current = path::parent(&dst_display);
        while current != "/" {
            state
                .folders
                .entry(path::canonical(&current))
                .or_insert_with(|| current.clone());
            current = path::parent(&current);
        }

        state.files.insert(
            path::canonical(&dst_display),
            FileEntry {
                path: dst_display.clone(),
                ..entry
            },
        );
        state.copied.push((path::normalize(src), dst_display));
        Ok(())
    }
}
