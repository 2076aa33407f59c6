//! EmptyFolderDetector: post-order emptiness classification.
//!
//! A folder is `Empty` iff every direct file is ignorable (matches the
//! system-file set when `ignore_system_files` is on; zero files otherwise)
//! and every direct subfolder is `Empty`. `Unknown` subtrees and pruned
//! (excluded) children force the parent to `NonEmpty` — unexamined content
//! is always assumed non-empty.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use sweep_provider::path as vfs_path;

use crate::config::CleanupConfig;
use crate::patterns::PatternSet;
use crate::scanner::{Emptiness, FolderNode};

/// Per-run classification statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectorStats {
    /// Folders examined, including degraded ones.
    pub total_scanned: usize,
    /// Direct file entries skipped as system files.
    pub system_files_ignored: usize,
    /// Folders the scan skipped via exclusion patterns.
    pub excluded_folders: usize,
    /// Count of empty folders per absolute path depth.
    pub depth_distribution: BTreeMap<usize, usize>,
}

/// Result of a classification run.
#[derive(Debug, Clone, Serialize)]
pub struct EmptyReport {
    /// Empty folder paths, deepest first, lexicographic within a depth.
    /// The scan root itself is never a candidate.
    pub empty: Vec<String>,
    pub stats: DetectorStats,
}

/// Classifies a scanned tree.
#[derive(Debug, Clone)]
pub struct EmptyFolderDetector {
    ignore_system_files: bool,
    system_files: PatternSet,
}

impl EmptyFolderDetector {
    pub fn new(ignore_system_files: bool, system_files: &[String]) -> Self {
        Self {
            ignore_system_files,
            system_files: PatternSet::compile(system_files),
        }
    }

    pub fn from_config(config: &CleanupConfig) -> Self {
        Self::new(config.ignore_system_files, &config.system_files)
    }

    /// Whether a file name counts toward a folder's content.
    pub fn file_qualifies(&self, name: &str) -> bool {
        !(self.ignore_system_files && self.system_files.matches(name))
    }

    /// Resolve `emptiness` bottom-up across the tree and report the empty
    /// set. Nodes the scan could not examine stay `Unknown`.
    pub fn classify(&self, root: &mut FolderNode) -> EmptyReport {
        let mut stats = DetectorStats::default();
        self.classify_node(root, &mut stats);

        let mut empty = Vec::new();
        collect_empty(root, true, &mut empty);
        // Deepest first; lexicographic within a level for determinism.
        empty.sort_by(|a, b| {
            vfs_path::depth(b)
                .cmp(&vfs_path::depth(a))
                .then_with(|| a.cmp(b))
        });

        for path in &empty {
            *stats
                .depth_distribution
                .entry(vfs_path::depth(path))
                .or_insert(0) += 1;
        }

        info!(
            empty = empty.len(),
            total_scanned = stats.total_scanned,
            system_files_ignored = stats.system_files_ignored,
            "Emptiness classification complete"
        );
        EmptyReport { empty, stats }
    }

    fn classify_node(&self, node: &mut FolderNode, stats: &mut DetectorStats) -> Emptiness {
        stats.total_scanned += 1;
        stats.excluded_folders += node.excluded_children;

        // Children first: a node is decided only after all of its children.
        let mut all_children_empty = true;
        for child in &mut node.children {
            if self.classify_node(child, stats) != Emptiness::Empty {
                all_children_empty = false;
            }
        }

        if !node.listed {
            node.emptiness = Emptiness::Unknown;
            return Emptiness::Unknown;
        }

        let mut qualifying = 0usize;
        for file in &node.files {
            if self.file_qualifies(file.name()) {
                qualifying += 1;
            } else {
                stats.system_files_ignored += 1;
            }
        }

        node.emptiness = if qualifying == 0 && all_children_empty && node.excluded_children == 0 {
            Emptiness::Empty
        } else {
            Emptiness::NonEmpty
        };
        node.emptiness
    }
}

fn collect_empty(node: &FolderNode, is_root: bool, out: &mut Vec<String>) {
    if !is_root && node.emptiness == Emptiness::Empty {
        out.push(node.path.clone());
    }
    for child in &node.children {
        collect_empty(child, false, out);
    }
}
