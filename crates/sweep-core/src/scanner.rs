//! TreeScanner: depth-first traversal of a provider tree.
//!
//! Walks a root path through the [`FileProvider`], paginating every folder
//! listing to completion before the folder counts as listed. Sibling
//! subtrees are scanned in parallel under a semaphore-bounded pool; every
//! provider call passes through the shared rate limiter. Transient listing
//! failures are retried with exponential backoff; exhaustion degrades the
//! subtree to `Unknown` and scanning continues with its siblings.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use backoff::ExponentialBackoffBuilder;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sweep_provider::{path as vfs_path, Entry, FileEntry, FileProvider, Page};

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::limiter::RateLimiter;
use crate::patterns::PatternSet;
use crate::progress::{ProgressEvent, ProgressSink, ScanProgress};

/// Emptiness classification of a folder.
///
/// `Unknown` never resolves to `Empty`: a subtree that could not be fully
/// examined is treated conservatively as possibly non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emptiness {
    #[default]
    Unknown,
    Empty,
    NonEmpty,
}

/// One folder of a scanned tree.
///
/// Owned exclusively by the scan that built it; the structure is read-only
/// once the scan completes (the detector only resolves `emptiness`).
#[derive(Debug, Clone, PartialEq)]
pub struct FolderNode {
    pub path: String,
    /// Absolute path depth (`/` is 0, `/a` is 1).
    pub depth: usize,
    pub children: Vec<FolderNode>,
    /// Direct file entries of this folder.
    pub files: Vec<FileEntry>,
    /// Recursive file count (direct plus all descendants).
    pub file_count: usize,
    /// Recursive size in bytes.
    pub total_size: u64,
    pub emptiness: Emptiness,
    /// Whether the listing of this folder completed; `false` marks a
    /// subtree degraded to `Unknown` (retry exhaustion or cycle guard).
    pub listed: bool,
    /// Number of excluded child folders skipped here; unexamined content
    /// forces this folder to `NonEmpty`.
    pub excluded_children: usize,
}

impl FolderNode {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let depth = vfs_path::depth(&path);
        Self {
            path,
            depth,
            children: Vec::new(),
            files: Vec::new(),
            file_count: 0,
            total_size: 0,
            emptiness: Emptiness::Unknown,
            listed: false,
            excluded_children: 0,
        }
    }
}

const MAX_LIST_ATTEMPTS: u32 = 5;
const RETRY_BASE: Duration = Duration::from_secs(1);

struct ScanCtx {
    provider: Arc<dyn FileProvider>,
    limiter: Arc<RateLimiter>,
    excludes: PatternSet,
    pool: Semaphore,
    visited: Mutex<HashSet<String>>,
    folders_seen: AtomicUsize,
    files_seen: AtomicUsize,
    started: Instant,
    cancel: CancellationToken,
    progress: ProgressSink,
}

impl ScanCtx {
    fn emit_progress(&self) {
        let folders = self.folders_seen.load(Ordering::Relaxed);
        let files = self.files_seen.load(Ordering::Relaxed);
        let elapsed = self.started.elapsed();
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 {
            ((folders + files) as f64 / secs) as u64
        } else {
            0
        };
        self.progress.emit(ProgressEvent::Scan(ScanProgress {
            folders,
            files,
            elapsed_ms: elapsed.as_millis() as u64,
            rate,
        }));
    }
}

/// Walks a provider tree into a [`FolderNode`] hierarchy.
pub struct TreeScanner {
    provider: Arc<dyn FileProvider>,
    limiter: Arc<RateLimiter>,
    config: ScanConfig,
}

impl TreeScanner {
    pub fn new(
        provider: Arc<dyn FileProvider>,
        limiter: Arc<RateLimiter>,
        config: ScanConfig,
    ) -> Self {
        Self {
            provider,
            limiter,
            config,
        }
    }

    /// Scan `root` into a tree.
    ///
    /// Returns the full tree, possibly containing `Unknown` subtrees where
    /// listings failed permanently. Cancellation discards in-flight state;
    /// a fresh scan always starts over.
    pub async fn scan(
        &self,
        root: &str,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> Result<FolderNode> {
        let root = vfs_path::normalize(root);
        info!(root = %root, workers = self.config.workers, "Starting tree scan");

        let ctx = Arc::new(ScanCtx {
            provider: Arc::clone(&self.provider),
            limiter: Arc::clone(&self.limiter),
            excludes: PatternSet::compile(&self.config.exclude_patterns),
            pool: Semaphore::new(self.config.workers.max(1)),
            visited: Mutex::new(HashSet::new()),
            folders_seen: AtomicUsize::new(0),
            files_seen: AtomicUsize::new(0),
            started: Instant::now(),
            cancel: cancel.clone(),
            progress: progress.clone(),
        });

        let node = scan_dir(ctx.clone(), root.clone()).await?;
        info!(
            root = %root,
            folders = ctx.folders_seen.load(Ordering::Relaxed),
            files = ctx.files_seen.load(Ordering::Relaxed),
            "Tree scan complete"
        );
        Ok(node)
    }
}

/// Recursively scan one folder. Listing failures degrade the node to
/// `Unknown` (`listed` stays false) instead of failing the whole scan;
/// only cancellation propagates as an error.
fn scan_dir(
    ctx: Arc<ScanCtx>,
    path: String,
) -> Pin<Box<dyn Future<Output = Result<FolderNode>> + Send>> {
    Box::pin(async move {
        let mut node = FolderNode::new(path.clone());

        // Cycle guard: a repeated canonical path is skipped, never re-entered.
        {
            let mut visited = ctx.visited.lock().unwrap();
            if !visited.insert(vfs_path::canonical(&path)) {
                warn!(path = %path, "Repeated canonical path, marking subtree Unknown");
                return Ok(node);
            }
        }

        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut child_paths: Vec<String> = Vec::new();
        {
            // The permit bounds concurrent provider listings; it is released
            // before descending so waiting on children cannot starve the pool.
            let _permit = match ctx.pool.acquire().await {
                Ok(permit) => permit,
                Err(_) => return Err(Error::Cancelled),
            };
            ctx.folders_seen.fetch_add(1, Ordering::Relaxed);

            let mut cursor: Option<String> = None;
            loop {
                if ctx.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let page = match list_page_with_retry(&ctx, &path, cursor.as_deref()).await {
                    Ok(page) => page,
                    Err(Error::Cancelled) => return Err(Error::Cancelled),
                    Err(err) => {
                        warn!(
                            path = %path,
                            error = %err,
                            "Listing failed after retries, subtree degraded to Unknown"
                        );
                        return Ok(node);
                    }
                };

                for entry in page.entries {
                    match entry {
                        Entry::File(file) => {
                            ctx.files_seen.fetch_add(1, Ordering::Relaxed);
                            node.files.push(file);
                        }
                        Entry::Folder(folder) => {
                            if ctx.excludes.matches(folder.name()) {
                                debug!(path = %folder.path, "Excluding folder by pattern");
                                node.excluded_children += 1;
                            } else {
                                child_paths.push(folder.path);
                            }
                        }
                    }
                }
                ctx.emit_progress();

                cursor = page.cursor;
                if cursor.is_none() {
                    break;
                }
            }
        }
        node.listed = true;

        child_paths.sort();
        let mut join = JoinSet::new();
        for child in child_paths {
            let ctx = Arc::clone(&ctx);
            join.spawn(async move { scan_dir(ctx, child).await });
        }

        let mut first_err: Option<Error> = None;
        while let Some(joined) = join.join_next().await {
            match joined {
                Ok(Ok(child)) => node.children.push(child),
                Ok(Err(err)) => first_err = Some(first_err.unwrap_or(err)),
                Err(join_err) => {
                    warn!(path = %node.path, error = %join_err, "Child scan task failed");
                    node.excluded_children += 1;
                }
            }
        }
        if let Some(err) = first_err {
            return Err(err);
        }

        node.children.sort_by(|a, b| a.path.cmp(&b.path));
        node.file_count =
            node.files.len() + node.children.iter().map(|c| c.file_count).sum::<usize>();
        node.total_size = node.files.iter().map(|f| f.size).sum::<u64>()
            + node.children.iter().map(|c| c.total_size).sum::<u64>();
        Ok(node)
    })
}

/// Fetch one listing page, retrying transient failures with exponential
/// backoff (base 1s, factor 2, at most [`MAX_LIST_ATTEMPTS`] calls).
async fn list_page_with_retry(ctx: &ScanCtx, path: &str, cursor: Option<&str>) -> Result<Page> {
    let attempts = AtomicU32::new(0);
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(RETRY_BASE)
        .with_multiplier(2.0)
        .with_randomization_factor(0.0)
        .with_max_elapsed_time(None)
        .build();

    backoff::future::retry(policy, || async {
        if ctx.cancel.is_cancelled() {
            return Err(backoff::Error::permanent(Error::Cancelled));
        }
        ctx.limiter.acquire().await;
        match ctx.provider.list_children(path, cursor).await {
            Ok(page) => Ok(page),
            Err(err) if err.is_transient() => {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt >= MAX_LIST_ATTEMPTS {
                    Err(backoff::Error::permanent(Error::Provider(err)))
                } else {
                    debug!(path = %path, attempt, error = %err, "Transient listing failure, retrying");
                    Err(backoff::Error::transient(Error::Provider(err)))
                }
            }
            Err(err) => Err(backoff::Error::permanent(Error::Provider(err))),
        }
    })
    .await
}
