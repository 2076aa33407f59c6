//! ExecutionEngine: applies validated plans against the provider.
//!
//! Every plan passes the safety valve exactly once before the first
//! provider call. Actions are attempted independently: a failed item is
//! recorded and execution continues. Cancellation is cooperative, checked
//! between actions; an in-flight provider call always completes. Cleanup
//! schedules run level by level with a barrier between depths, re-validating
//! each candidate against the live provider and folding newly empty parents
//! into the next-shallower level.

use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use backoff::ExponentialBackoffBuilder;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sweep_provider::{path as vfs_path, FileProvider, ProviderError};

use crate::config::SafetyConfig;
use crate::detect::EmptyFolderDetector;
use crate::limiter::RateLimiter;
use crate::planner::{DeletionLevel, DeletionPlanner, DeletionSchedule};
use crate::progress::{ExecuteProgress, ProgressEvent, ProgressSink};
use crate::safety::{SafetyValve, SideTotals, Verdict};

const MAX_ACTION_ATTEMPTS: u32 = 5;
const RETRY_BASE: Duration = Duration::from_secs(1);

/// What an action does to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Delete,
    Copy,
    /// Prefer trash/archive; falls back to an acknowledged permanent
    /// delete on providers without trash support.
    SoftDelete,
}

/// One planned provider operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub kind: ActionKind,
    pub source: String,
    /// Destination path, for copies only.
    pub target: Option<String>,
    pub depth: usize,
}

/// Ordered batch of actions. Built once, consumed once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionPlan {
    pub actions: Vec<Action>,
}

impl ExecutionPlan {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// One per-item failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionError {
    pub path: String,
    pub error: String,
}

/// Terminal state of a run. Callers must branch on this, never infer
/// success from the absence of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Complete,
    PartialFailure,
    SafetyAborted,
    Cancelled,
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub deleted: usize,
    pub copied: usize,
    pub skipped: usize,
    pub errors: Vec<ActionError>,
    pub status: Status,
    /// Populated only for [`Status::SafetyAborted`].
    pub abort_reason: Option<String>,
    pub abort_ratio: Option<f64>,
}

impl ExecutionSummary {
    fn safety_aborted(planned: usize, reason: String, ratio: f64) -> Self {
        Self {
            deleted: 0,
            copied: 0,
            skipped: planned,
            errors: Vec::new(),
            status: Status::SafetyAborted,
            abort_reason: Some(reason),
            abort_ratio: Some(ratio),
        }
    }
}

enum Outcome {
    Deleted,
    Copied,
    Skipped,
    CancelSkip,
    Failed(String),
}

#[derive(Default)]
struct Tally {
    deleted: usize,
    copied: usize,
    skipped: usize,
    errors: Vec<ActionError>,
    done: usize,
    cancelled: bool,
}

struct RunState {
    total: AtomicUsize,
    started: Instant,
    progress: ProgressSink,
    tally: Mutex<Tally>,
}

impl RunState {
    fn new(total: usize, progress: ProgressSink) -> Arc<Self> {
        Arc::new(Self {
            total: AtomicUsize::new(total),
            started: Instant::now(),
            progress,
            tally: Mutex::new(Tally::default()),
        })
    }

    fn add_total(&self, extra: usize) {
        self.total.fetch_add(extra, Ordering::Relaxed);
    }

    fn record(&self, path: &str, outcome: Outcome) {
        let snapshot = {
            let mut tally = self.tally.lock().unwrap();
            tally.done += 1;
            match outcome {
                Outcome::Deleted => tally.deleted += 1,
                Outcome::Copied => tally.copied += 1,
                Outcome::Skipped => tally.skipped += 1,
                Outcome::CancelSkip => {
                    tally.skipped += 1;
                    tally.cancelled = true;
                }
                Outcome::Failed(error) => {
                    warn!(path = %path, error = %error, "Action failed");
                    tally.errors.push(ActionError {
                        path: path.to_string(),
                        error,
                    });
                }
            }

            let total = self.total.load(Ordering::Relaxed);
            let elapsed = self.started.elapsed();
            let secs = elapsed.as_secs_f64();
            ExecuteProgress {
                deleted: tally.deleted,
                copied: tally.copied,
                skipped: tally.skipped,
                errors: tally.errors.len(),
                percent: if total == 0 {
                    100.0
                } else {
                    tally.done as f64 * 100.0 / total as f64
                },
                current_path: path.to_string(),
                elapsed_ms: elapsed.as_millis() as u64,
                rate: if secs > 0.0 {
                    (tally.done as f64 / secs) as u64
                } else {
                    0
                },
            }
        };
        self.progress.emit(ProgressEvent::Execute(snapshot));
    }

    fn summary(&self) -> ExecutionSummary {
        let tally = self.tally.lock().unwrap();
        let status = if tally.cancelled {
            Status::Cancelled
        } else if !tally.errors.is_empty() {
            Status::PartialFailure
        } else {
            Status::Complete
        };
        ExecutionSummary {
            deleted: tally.deleted,
            copied: tally.copied,
            skipped: tally.skipped,
            errors: tally.errors.clone(),
            status,
            abort_reason: None,
            abort_ratio: None,
        }
    }
}

/// Applies plans and schedules. Cheap to clone; shares the provider and
/// rate limiter.
#[derive(Clone)]
pub struct ExecutionEngine {
    provider: Arc<dyn FileProvider>,
    limiter: Arc<RateLimiter>,
    workers: usize,
    acknowledge_permanent_delete: bool,
}

impl ExecutionEngine {
    pub fn new(
        provider: Arc<dyn FileProvider>,
        limiter: Arc<RateLimiter>,
        workers: usize,
        acknowledge_permanent_delete: bool,
    ) -> Self {
        Self {
            provider,
            limiter,
            workers: workers.max(1),
            acknowledge_permanent_delete,
        }
    }

    /// Execute a flat plan. Actions have no ordering dependency and run in
    /// parallel, bounded by the worker pool.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        totals: SideTotals,
        safety: &SafetyConfig,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> ExecutionSummary {
        if let Verdict::Abort { reason, ratio } = SafetyValve::evaluate(plan, totals, safety) {
            return ExecutionSummary::safety_aborted(plan.len(), reason, ratio);
        }

        let run = RunState::new(plan.len(), progress.clone());
        let pool = Arc::new(Semaphore::new(self.workers));
        let mut join = JoinSet::new();
        for action in plan.actions.iter().cloned() {
            let engine = self.clone();
            let run = Arc::clone(&run);
            let pool = Arc::clone(&pool);
            let cancel = cancel.clone();
            join.spawn(async move {
                let Ok(_permit) = pool.acquire().await else {
                    run.record(&action.source, Outcome::CancelSkip);
                    return;
                };
                if cancel.is_cancelled() {
                    run.record(&action.source, Outcome::CancelSkip);
                    return;
                }
                let outcome = engine.perform(&action, &cancel).await;
                run.record(&action.source, outcome);
            });
        }
        while join.join_next().await.is_some() {}

        let summary = run.summary();
        info!(
            deleted = summary.deleted,
            copied = summary.copied,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            status = ?summary.status,
            "Plan execution finished"
        );
        summary
    }

    /// Execute a cleanup schedule level by level, deepest first.
    ///
    /// Every candidate is re-validated against the live provider right
    /// before its level runs. A barrier separates depths: no folder at
    /// depth `d - 1` is touched until every folder at depth `d` finished.
    /// After a level completes, parents of the folders it removed are
    /// checked and, when newly empty, folded into the next level.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute_schedule(
        &self,
        root: &str,
        schedule: &DeletionSchedule,
        detector: &EmptyFolderDetector,
        use_trash: bool,
        totals: SideTotals,
        safety: &SafetyConfig,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> ExecutionSummary {
        let plan = DeletionPlanner::to_plan(schedule, use_trash);
        if let Verdict::Abort { reason, ratio } = SafetyValve::evaluate(&plan, totals, safety) {
            return ExecutionSummary::safety_aborted(plan.len(), reason, ratio);
        }

        let kind = if use_trash {
            ActionKind::SoftDelete
        } else {
            ActionKind::Delete
        };
        let root_depth = vfs_path::depth(&vfs_path::normalize(root));
        let detector = Arc::new(detector.clone());
        let run = RunState::new(schedule.folder_count(), progress.clone());
        let mut scheduled: HashSet<String> = schedule
            .levels
            .iter()
            .flat_map(|level| level.folders.iter())
            .map(|folder| vfs_path::canonical(folder))
            .collect();

        let mut levels = schedule.levels.clone();
        let mut i = 0;
        while i < levels.len() {
            if cancel.is_cancelled() {
                for level in levels.iter().skip(i) {
                    for folder in &level.folders {
                        run.record(folder, Outcome::CancelSkip);
                    }
                }
                break;
            }

            let level = levels[i].clone();
            debug!(depth = level.depth, folders = level.folders.len(), "Deleting level");
            let deleted = Arc::new(Mutex::new(Vec::<String>::new()));
            let pool = Arc::new(Semaphore::new(self.workers));
            let mut join = JoinSet::new();
            for folder in level.folders {
                let engine = self.clone();
                let detector = Arc::clone(&detector);
                let run = Arc::clone(&run);
                let pool = Arc::clone(&pool);
                let deleted = Arc::clone(&deleted);
                let cancel = cancel.clone();
                let depth = level.depth;
                join.spawn(async move {
                    let Ok(_permit) = pool.acquire().await else {
                        run.record(&folder, Outcome::CancelSkip);
                        return;
                    };
                    if cancel.is_cancelled() {
                        run.record(&folder, Outcome::CancelSkip);
                        return;
                    }
                    let empty = match DeletionPlanner::still_empty(
                        engine.provider.as_ref(),
                        &engine.limiter,
                        &folder,
                        &detector,
                    )
                    .await
                    {
                        Ok(empty) => empty,
                        Err(err) => {
                            warn!(path = %folder, error = %err, "Re-validation failed, skipping");
                            false
                        }
                    };
                    if !empty {
                        run.record(&folder, Outcome::Skipped);
                        return;
                    }
                    let action = Action {
                        kind,
                        source: folder.clone(),
                        target: None,
                        depth,
                    };
                    let outcome = engine.perform(&action, &cancel).await;
                    if matches!(outcome, Outcome::Deleted) {
                        deleted.lock().unwrap().push(folder.clone());
                    }
                    run.record(&folder, outcome);
                });
            }
            // Barrier: the whole level completes before the next is touched.
            while join.join_next().await.is_some() {}

            let removed = deleted.lock().unwrap().clone();
            let parent_depth = level.depth.saturating_sub(1);
            if parent_depth > root_depth && !removed.is_empty() && !cancel.is_cancelled() {
                let mut fold: Vec<String> = Vec::new();
                let mut seen = BTreeSet::new();
                for path in &removed {
                    let parent = vfs_path::parent(path);
                    let canon = vfs_path::canonical(&parent);
                    if !seen.insert(canon.clone()) || scheduled.contains(&canon) {
                        continue;
                    }
                    match DeletionPlanner::still_empty(
                        self.provider.as_ref(),
                        &self.limiter,
                        &parent,
                        &detector,
                    )
                    .await
                    {
                        Ok(true) => {
                            scheduled.insert(canon);
                            fold.push(parent);
                        }
                        Ok(false) => {}
                        Err(err) => {
                            warn!(path = %parent, error = %err, "Parent check failed");
                        }
                    }
                }
                if !fold.is_empty() {
                    fold.sort();
                    run.add_total(fold.len());
                    info!(
                        folded = fold.len(),
                        depth = parent_depth,
                        "Newly empty parents folded into the schedule"
                    );
                    match levels.get_mut(i + 1) {
                        Some(next) if next.depth == parent_depth => {
                            next.folders.extend(fold);
                            next.folders.sort();
                            next.folders.dedup();
                        }
                        _ => levels.insert(
                            i + 1,
                            DeletionLevel {
                                depth: parent_depth,
                                folders: fold,
                            },
                        ),
                    }
                }
            }
            i += 1;
        }

        let summary = run.summary();
        info!(
            deleted = summary.deleted,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            status = ?summary.status,
            "Schedule execution finished"
        );
        summary
    }

    async fn perform(&self, action: &Action, cancel: &CancellationToken) -> Outcome {
        match action.kind {
            ActionKind::Copy => {
                let Some(target) = action.target.as_deref() else {
                    return Outcome::Failed("copy action without a target".to_string());
                };
                match self
                    .call_with_retry(&action.source, cancel, || {
                        self.provider.copy(&action.source, target)
                    })
                    .await
                {
                    Ok(()) => Outcome::Copied,
                    Err(err) => Outcome::Failed(err.to_string()),
                }
            }
            ActionKind::Delete | ActionKind::SoftDelete => {
                let soft = action.kind == ActionKind::SoftDelete
                    && self.provider.capabilities().supports_trash;
                if !soft && !self.acknowledge_permanent_delete {
                    return Outcome::Failed(
                        "irreversible delete requires acknowledge_permanent_delete".to_string(),
                    );
                }
                match self
                    .call_with_retry(&action.source, cancel, || {
                        self.provider.delete(&action.source, soft)
                    })
                    .await
                {
                    Ok(()) => Outcome::Deleted,
                    Err(ProviderError::NotFound { .. }) => {
                        debug!(path = %action.source, "Already gone");
                        Outcome::Skipped
                    }
                    Err(err) => Outcome::Failed(err.to_string()),
                }
            }
        }
    }

    /// Retry transient failures with exponential backoff (base 1s, factor
    /// 2, at most [`MAX_ACTION_ATTEMPTS`] calls). Cancellation stops
    /// further attempts; the in-flight call always completes.
    async fn call_with_retry<F, Fut>(
        &self,
        path: &str,
        cancel: &CancellationToken,
        op: F,
    ) -> std::result::Result<(), ProviderError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<(), ProviderError>>,
    {
        let attempts = AtomicU32::new(0);
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(RETRY_BASE)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build();

        backoff::future::retry(policy, || async {
            if cancel.is_cancelled() {
                return Err(backoff::Error::permanent(ProviderError::permanent(
                    path,
                    "cancelled before retry",
                )));
            }
            self.limiter.acquire().await;
            match op().await {
                Ok(()) => Ok(()),
                Err(err) if err.is_transient() => {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempt >= MAX_ACTION_ATTEMPTS {
                        Err(backoff::Error::permanent(err))
                    } else {
                        debug!(path = %path, attempt, error = %err, "Transient failure, retrying");
                        Err(backoff::Error::transient(err))
                    }
                }
                Err(err) => Err(backoff::Error::permanent(err)),
            }
        })
        .await
    }
}
