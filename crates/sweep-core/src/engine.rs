//! Cleaner and Reconciler facades.
//!
//! Wire the phases together over one provider: scan, classify, plan,
//! valve, execute. A dry run stops after planning and reports what would
//! have happened, including the valve verdict, without a single
//! destructive provider call.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use sweep_provider::{path as vfs_path, FileProvider};

use crate::compare::{CompareEngine, ComparisonResult};
use crate::config::{CleanupConfig, CompareConfig};
use crate::detect::{DetectorStats, EmptyFolderDetector};
use crate::error::Result;
use crate::execute::{ExecutionEngine, ExecutionPlan, ExecutionSummary, Status};
use crate::limiter::RateLimiter;
use crate::planner::DeletionPlanner;
use crate::progress::ProgressSink;
use crate::safety::{SafetyValve, SideTotals, Verdict};
use crate::scanner::TreeScanner;

/// Per-run switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Plan and report only; no destructive provider call is issued.
    pub dry_run: bool,
}

/// Outcome of a cleanup run.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub root: String,
    /// Folders classified empty, deepest first.
    pub empty_folders: Vec<String>,
    pub stats: DetectorStats,
    pub summary: ExecutionSummary,
}

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub left_root: String,
    pub right_root: String,
    pub comparison: ComparisonResult,
    pub summary: ExecutionSummary,
}

/// When the valve would abort, a dry run reports that verdict instead of
/// pretending the batch would have run.
fn dry_run_summary(plan: &ExecutionPlan, verdict: Verdict) -> ExecutionSummary {
    let (status, abort_reason, abort_ratio) = match verdict {
        Verdict::Proceed => (Status::Complete, None, None),
        Verdict::Abort { reason, ratio } => (Status::SafetyAborted, Some(reason), Some(ratio)),
    };
    ExecutionSummary {
        deleted: 0,
        copied: 0,
        skipped: plan.len(),
        errors: Vec::new(),
        status,
        abort_reason,
        abort_ratio,
    }
}

/// Single-tree empty-folder cleanup over one provider.
pub struct Cleaner {
    provider: Arc<dyn FileProvider>,
    config: CleanupConfig,
}

impl Cleaner {
    pub fn new(provider: Arc<dyn FileProvider>, config: CleanupConfig) -> Self {
        Self { provider, config }
    }

    pub async fn run(
        &self,
        root: &str,
        options: RunOptions,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> Result<CleanupReport> {
        let root = vfs_path::normalize(root);
        let limiter = Arc::new(RateLimiter::new(self.config.scan.rate_limit_per_sec));
        let scanner = TreeScanner::new(
            Arc::clone(&self.provider),
            Arc::clone(&limiter),
            self.config.scan.clone(),
        );
        let mut tree = scanner.scan(&root, cancel, progress).await?;

        let detector = EmptyFolderDetector::from_config(&self.config);
        let report = detector.classify(&mut tree);
        let schedule = DeletionPlanner::schedule(&report);
        let totals = SideTotals {
            file_count: tree.file_count,
        };

        let summary = if options.dry_run {
            let plan = DeletionPlanner::to_plan(&schedule, self.config.use_trash);
            let verdict = SafetyValve::evaluate(&plan, totals, &self.config.safety);
            info!(root = %root, planned = plan.len(), "Dry run, nothing executed");
            dry_run_summary(&plan, verdict)
        } else {
            let engine = ExecutionEngine::new(
                Arc::clone(&self.provider),
                limiter,
                self.config.scan.workers,
                self.config.acknowledge_permanent_delete,
            );
            engine
                .execute_schedule(
                    &root,
                    &schedule,
                    &detector,
                    self.config.use_trash,
                    totals,
                    &self.config.safety,
                    cancel,
                    progress,
                )
                .await
        };

        Ok(CleanupReport {
            root,
            empty_folders: report.empty,
            stats: report.stats,
            summary,
        })
    }
}

/// Two-tree reconciliation between two roots of one provider.
pub struct Reconciler {
    provider: Arc<dyn FileProvider>,
    config: CompareConfig,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn FileProvider>, config: CompareConfig) -> Self {
        Self { provider, config }
    }

    pub async fn run(
        &self,
        left_root: &str,
        right_root: &str,
        options: RunOptions,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> Result<ReconcileReport> {
        let left_root = vfs_path::normalize(left_root);
        let right_root = vfs_path::normalize(right_root);
        let limiter = Arc::new(RateLimiter::new(self.config.scan.rate_limit_per_sec));
        let scanner = TreeScanner::new(
            Arc::clone(&self.provider),
            Arc::clone(&limiter),
            self.config.scan.clone(),
        );
        let (left, right) = tokio::try_join!(
            scanner.scan(&left_root, cancel, progress),
            scanner.scan(&right_root, cancel, progress),
        )?;

        let compare = CompareEngine::new(&self.config);
        let comparison = compare.compare(&left, &right, progress);
        let plan = compare.build_plan(
            &comparison,
            &left_root,
            &right_root,
            self.config.use_trash,
        );
        let totals = SideTotals {
            file_count: comparison.target_file_count,
        };

        let summary = if options.dry_run {
            let verdict = SafetyValve::evaluate(&plan, totals, &self.config.safety);
            info!(
                left = %left_root,
                right = %right_root,
                planned = plan.len(),
                "Dry run, nothing executed"
            );
            dry_run_summary(&plan, verdict)
        } else {
            let engine = ExecutionEngine::new(
                Arc::clone(&self.provider),
                limiter,
                self.config.scan.workers,
                self.config.acknowledge_permanent_delete,
            );
            engine
                .execute(&plan, totals, &self.config.safety, cancel, progress)
                .await
        };

        Ok(ReconcileReport {
            left_root,
            right_root,
            comparison,
            summary,
        })
    }
}
