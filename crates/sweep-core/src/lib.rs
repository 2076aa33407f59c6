//! Hygiene and replication core for hierarchical file stores.
//!
//! Reasons about the state of a virtual file system to find semantically
//! empty folders, order their removal so no folder is deleted before its
//! descendants, diff two trees into copy/delete/conflict sets, and guard
//! destructive batches with a threshold-based safety valve.
//!
//! Single-tree cleanup: [`TreeScanner`] -> [`EmptyFolderDetector`] ->
//! [`DeletionPlanner`] -> [`SafetyValve`] -> [`ExecutionEngine`].
//! Two-tree reconciliation: [`TreeScanner`] (x2) -> [`CompareEngine`] ->
//! [`SafetyValve`] -> [`ExecutionEngine`]. The [`Cleaner`] and
//! [`Reconciler`] facades wire these flows together.

pub mod compare;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod execute;
pub mod limiter;
pub mod patterns;
pub mod planner;
pub mod progress;
pub mod safety;
pub mod scanner;

pub use compare::{CompareEngine, ComparisonResult, DiffEntry, DiffReason};
pub use config::{
    CleanupConfig, CompareConfig, Direction, SafetyConfig, ScanConfig, default_system_files,
};
pub use detect::{DetectorStats, EmptyFolderDetector, EmptyReport};
pub use engine::{Cleaner, CleanupReport, ReconcileReport, Reconciler, RunOptions};
pub use error::{Error, Result};
pub use execute::{Action, ActionKind, ExecutionEngine, ExecutionPlan, ExecutionSummary, Status};
pub use limiter::RateLimiter;
pub use patterns::PatternSet;
pub use planner::{DeletionPlanner, DeletionSchedule};
pub use progress::{
    CompareProgress, ExecuteProgress, ProgressEvent, ProgressSink, ScanProgress,
};
pub use safety::{SafetyValve, SideTotals, Verdict};
pub use scanner::{Emptiness, FolderNode, TreeScanner};
