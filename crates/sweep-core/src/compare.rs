//! CompareEngine: bidirectional tree diff.
//!
//! Two scanned trees are flattened into `relative_path -> FileEntry` maps
//! keyed on the lowercased relative path, then classified per path into
//! unchanged, conflict, left-only or right-only. Conflicts are reported,
//! never auto-resolved; only one-sided files feed the copy/delete sets,
//! under an explicit direction that is a parameter, never inferred.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use sweep_provider::{path as vfs_path, FileEntry};

use crate::config::{CompareConfig, Direction};
use crate::execute::{Action, ActionKind, ExecutionPlan};
use crate::progress::{CompareProgress, ProgressEvent, ProgressSink};
use crate::scanner::FolderNode;

/// Why a file landed in a diff set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffReason {
    LeftOnly,
    RightOnly,
    SizeMismatch,
    TimeMismatch,
    HashMismatch,
}

/// One classified file.
#[derive(Debug, Clone, Serialize)]
pub struct DiffEntry {
    /// Path relative to the side's scan root, display case, no leading `/`.
    pub rel_path: String,
    pub file: FileEntry,
    pub reason: DiffReason,
}

/// Immutable comparison snapshot, rebuilt on every run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonResult {
    /// Files to push from the source side to the target side.
    pub to_copy: Vec<DiffEntry>,
    /// Target-side files absent on the source side, assumed removed.
    pub to_delete: Vec<DiffEntry>,
    pub left_only: Vec<DiffEntry>,
    pub right_only: Vec<DiffEntry>,
    /// Present on both sides but differing. Reported only.
    pub conflicts: Vec<DiffEntry>,
    /// File count on the side `to_delete` acts on, for the safety valve.
    pub target_file_count: usize,
}

/// Diffs two scanned trees under a fuzzy-time rule.
#[derive(Debug, Clone)]
pub struct CompareEngine {
    epsilon_seconds: i64,
    direction: Direction,
}

impl CompareEngine {
    pub fn new(config: &CompareConfig) -> Self {
        Self {
            epsilon_seconds: config.epsilon_seconds,
            direction: config.direction,
        }
    }

    /// Timestamps are equal within `epsilon`, or within `epsilon` of a
    /// one-hour offset (daylight-saving shifts on stores keeping local
    /// time).
    fn times_equal(&self, a: &FileEntry, b: &FileEntry) -> bool {
        let dt = (a.modified - b.modified).num_seconds().abs();
        dt <= self.epsilon_seconds || (dt - 3600).abs() <= self.epsilon_seconds
    }

    /// First mismatch between two entries, or `None` when unchanged.
    fn mismatch(&self, a: &FileEntry, b: &FileEntry) -> Option<DiffReason> {
        if a.size != b.size {
            return Some(DiffReason::SizeMismatch);
        }
        if !self.times_equal(a, b) {
            return Some(DiffReason::TimeMismatch);
        }
        if let (Some(ha), Some(hb)) = (&a.content_hash, &b.content_hash) {
            if !ha.eq_ignore_ascii_case(hb) {
                return Some(DiffReason::HashMismatch);
            }
        }
        None
    }

    /// Classify every file under `left` against every file under `right`.
    pub fn compare(
        &self,
        left: &FolderNode,
        right: &FolderNode,
        progress: &ProgressSink,
    ) -> ComparisonResult {
        let left_index = index_files(left);
        let right_index = index_files(right);

        let mut keys: Vec<&String> = left_index.keys().chain(right_index.keys()).collect();
        keys.sort();
        keys.dedup();
        let total = keys.len();

        let mut result = ComparisonResult::default();
        for (compared, key) in keys.into_iter().enumerate() {
            match (left_index.get(key), right_index.get(key)) {
                (Some((rel, file)), None) => {
                    result.left_only.push(entry(rel, file, DiffReason::LeftOnly));
                }
                (None, Some((rel, file))) => {
                    result
                        .right_only
                        .push(entry(rel, file, DiffReason::RightOnly));
                }
                (Some((rel, lf)), Some((_, rf))) => {
                    if let Some(reason) = self.mismatch(lf, rf) {
                        debug!(rel_path = %rel, ?reason, "Conflict");
                        result.conflicts.push(entry(rel, lf, reason));
                    }
                }
                (None, None) => unreachable!("key came from one of the indexes"),
            }
            if (compared + 1) % 256 == 0 || compared + 1 == total {
                progress.emit(ProgressEvent::Compare(CompareProgress {
                    left_files: left_index.len(),
                    right_files: right_index.len(),
                    compared: compared + 1,
                    total,
                }));
            }
        }

        let (to_copy, to_delete, target_files) = match self.direction {
            Direction::LeftToRight => (
                result.left_only.clone(),
                result.right_only.clone(),
                right_index.len(),
            ),
            Direction::RightToLeft => (
                result.right_only.clone(),
                result.left_only.clone(),
                left_index.len(),
            ),
        };
        result.to_copy = to_copy;
        result.to_delete = to_delete;
        result.target_file_count = target_files;

        info!(
            left = left_index.len(),
            right = right_index.len(),
            to_copy = result.to_copy.len(),
            to_delete = result.to_delete.len(),
            conflicts = result.conflicts.len(),
            "Comparison complete"
        );
        result
    }

    /// Turn a comparison into an executable plan against the target side.
    pub fn build_plan(
        &self,
        result: &ComparisonResult,
        left_root: &str,
        right_root: &str,
        use_trash: bool,
    ) -> ExecutionPlan {
        let (source_root, target_root) = match self.direction {
            Direction::LeftToRight => (left_root, right_root),
            Direction::RightToLeft => (right_root, left_root),
        };
        let delete_kind = if use_trash {
            ActionKind::SoftDelete
        } else {
            ActionKind::Delete
        };

        let mut actions = Vec::with_capacity(result.to_copy.len() + result.to_delete.len());
        for diff in &result.to_copy {
            let target = join_rel(target_root, &diff.rel_path);
            actions.push(Action {
                kind: ActionKind::Copy,
                source: join_rel(source_root, &diff.rel_path),
                depth: vfs_path::depth(&target),
                target: Some(target),
            });
        }
        for diff in &result.to_delete {
            let source = join_rel(target_root, &diff.rel_path);
            actions.push(Action {
                kind: delete_kind,
                depth: vfs_path::depth(&source),
                source,
                target: None,
            });
        }
        ExecutionPlan { actions }
    }
}

fn entry(rel: &str, file: &FileEntry, reason: DiffReason) -> DiffEntry {
    DiffEntry {
        rel_path: rel.to_string(),
        file: file.clone(),
        reason,
    }
}

fn join_rel(root: &str, rel: &str) -> String {
    if root == "/" {
        format!("/{rel}")
    } else {
        format!("{root}/{rel}")
    }
}

/// `lowercased rel path -> (display rel path, entry)` for a whole subtree.
fn index_files(root: &FolderNode) -> BTreeMap<String, (String, FileEntry)> {
    let mut index = BTreeMap::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        for file in &node.files {
            if let Some(rel) = vfs_path::relative_to(&file.path, &root.path) {
                index.insert(rel.to_lowercase(), (rel.to_string(), file.clone()));
            }
        }
        stack.extend(node.children.iter());
    }
    index
}
