//! Configuration inputs consumed by the core.
//!
//! Loading and persistence are owned by the outer layer; the core only
//! receives these as immutable values. Every component call takes its
//! config explicitly, never through process-wide state.

use serde::{Deserialize, Serialize};

/// Default system-file patterns treated as ignorable content.
pub fn default_system_files() -> Vec<String> {
    [
        ".DS_Store",
        "Thumbs.db",
        "desktop.ini",
        "*.alias",
        "*.lnk",
        ".dropbox",
        ".dropbox.attr",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    4
}

fn default_rate() -> f64 {
    20.0
}

fn default_ratio() -> f64 {
    0.5
}

fn default_epsilon() -> i64 {
    2
}

/// Thresholds guarding destructive batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Abort when `deletes / side file count` exceeds this ratio.
    #[serde(default = "default_ratio")]
    pub max_deletion_ratio: f64,
    /// Absolute cap on delete actions, when set.
    #[serde(default)]
    pub max_deletion_count: Option<usize>,
    /// Explicit bypass of both thresholds.
    #[serde(default, rename = "override")]
    pub bypass: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            max_deletion_ratio: default_ratio(),
            max_deletion_count: None,
            bypass: false,
        }
    }
}

/// Traversal knobs shared by every scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Folder names (exact or glob) that are not entered, not reported,
    /// and force the parent to NonEmpty.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Bounded worker pool size for sibling subtrees.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Shared token-bucket rate for provider calls, per second.
    #[serde(default = "default_rate")]
    pub rate_limit_per_sec: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: Vec::new(),
            workers: default_workers(),
            rate_limit_per_sec: default_rate(),
        }
    }
}

/// Configuration for single-tree empty-folder cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    #[serde(default, flatten)]
    pub scan: ScanConfig,
    /// Treat files matching `system_files` as ignorable when deciding
    /// emptiness.
    #[serde(default = "default_true")]
    pub ignore_system_files: bool,
    /// Exact names or globs matched case-insensitively against file names.
    #[serde(default = "default_system_files")]
    pub system_files: Vec<String>,
    /// Prefer soft deletion (trash/archive) when the provider supports it.
    #[serde(default = "default_true")]
    pub use_trash: bool,
    /// Required acknowledgement before issuing irreversible deletes on a
    /// provider without trash support.
    #[serde(default)]
    pub acknowledge_permanent_delete: bool,
    #[serde(default)]
    pub safety: SafetyConfig,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            ignore_system_files: true,
            system_files: default_system_files(),
            use_trash: true,
            acknowledge_permanent_delete: false,
            safety: SafetyConfig::default(),
        }
    }
}

/// Which side a reconciliation converges toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Reconcile right to match left: copy `left_only`, delete `right_only`.
    #[default]
    LeftToRight,
    /// Reconcile left to match right.
    RightToLeft,
}

/// Configuration for two-tree reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    #[serde(default, flatten)]
    pub scan: ScanConfig,
    /// Fuzzy-time window: timestamps within this many seconds are equal.
    #[serde(default = "default_epsilon")]
    pub epsilon_seconds: i64,
    /// Explicit reconciliation direction, never inferred.
    #[serde(default)]
    pub direction: Direction,
    /// Prefer soft deletion (trash/archive) when the provider supports it.
    #[serde(default = "default_true")]
    pub use_trash: bool,
    /// Required acknowledgement before issuing irreversible deletes on a
    /// provider without trash support.
    #[serde(default)]
    pub acknowledge_permanent_delete: bool,
    #[serde(default)]
    pub safety: SafetyConfig,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            epsilon_seconds: default_epsilon(),
            direction: Direction::default(),
            use_trash: true,
            acknowledge_permanent_delete: false,
            safety: SafetyConfig::default(),
        }
    }
}
