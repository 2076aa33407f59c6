//! DeletionPlanner: depth-ordered, re-validated deletion scheduling.
//!
//! The empty set is processed level by level from deepest to shallowest so
//! no folder is ever ordered before a descendant. Within a level siblings
//! are sorted lexicographically for determinism only; they have no ordering
//! dependency. The planner also owns the live re-validation check the
//! executor runs immediately before each level, guarding against writes
//! that landed between scan and delete.

use tracing::{debug, info};

use sweep_provider::{path as vfs_path, Entry, FileProvider, ProviderError};

use crate::detect::{EmptyFolderDetector, EmptyReport};
use crate::execute::{Action, ActionKind, ExecutionPlan};
use crate::limiter::RateLimiter;

/// One depth level of the schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionLevel {
    pub depth: usize,
    /// Candidate folders at this depth, ascending lexicographic.
    pub folders: Vec<String>,
}

/// Full deletion schedule, deepest level first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionSchedule {
    pub levels: Vec<DeletionLevel>,
}

impl DeletionSchedule {
    pub fn folder_count(&self) -> usize {
        self.levels.iter().map(|l| l.folders.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Builds deletion schedules and plans from an [`EmptyReport`].
pub struct DeletionPlanner;

impl DeletionPlanner {
    /// Group the empty set into levels, deepest first.
    pub fn schedule(report: &EmptyReport) -> DeletionSchedule {
        let mut schedule = DeletionSchedule::default();
        // report.empty is already deepest-first, lexicographic in-level.
        for path in &report.empty {
            let depth = vfs_path::depth(path);
            match schedule.levels.last_mut() {
                Some(level) if level.depth == depth => level.folders.push(path.clone()),
                _ => schedule.levels.push(DeletionLevel {
                    depth,
                    folders: vec![path.clone()],
                }),
            }
        }
        info!(
            folders = schedule.folder_count(),
            levels = schedule.levels.len(),
            "Deletion schedule built"
        );
        schedule
    }

    /// Flatten a schedule into an executable plan. Depth strictly
    /// decreases through the resulting action list.
    pub fn to_plan(schedule: &DeletionSchedule, use_trash: bool) -> ExecutionPlan {
        let kind = if use_trash {
            ActionKind::SoftDelete
        } else {
            ActionKind::Delete
        };
        let actions = schedule
            .levels
            .iter()
            .flat_map(|level| {
                level.folders.iter().map(move |path| Action {
                    kind,
                    source: path.clone(),
                    target: None,
                    depth: level.depth,
                })
            })
            .collect();
        ExecutionPlan { actions }
    }

    /// Live re-validation: does `path` still have zero qualifying entries?
    ///
    /// Any subfolder or any non-ignorable file disqualifies the candidate.
    /// Provider failures propagate; the caller must treat a failed check as
    /// "not empty" and skip the deletion.
    pub async fn still_empty(
        provider: &dyn FileProvider,
        limiter: &RateLimiter,
        path: &str,
        detector: &EmptyFolderDetector,
    ) -> Result<bool, ProviderError> {
        let mut cursor: Option<String> = None;
        loop {
            limiter.acquire().await;
            let page = provider.list_children(path, cursor.as_deref()).await?;
            for entry in page.entries {
                match entry {
                    Entry::Folder(_) => {
                        debug!(path = %path, "Re-validation found a subfolder, skipping");
                        return Ok(false);
                    }
                    Entry::File(file) => {
                        if detector.file_qualifies(file.name()) {
                            debug!(path = %path, file = %file.path, "Re-validation found content, skipping");
                            return Ok(false);
                        }
                    }
                }
            }
            cursor = page.cursor;
            if cursor.is_none() {
                return Ok(true);
            }
        }
    }
}
