//! SafetyValve: threshold gate in front of destructive batches.
//!
//! Evaluated exactly once per plan, before the first action runs; the
//! verdict gates the whole batch and is never recomputed mid-execution.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::SafetyConfig;
use crate::execute::{ActionKind, ExecutionPlan};

/// File population on the side deletions act on.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SideTotals {
    pub file_count: usize,
}

/// Outcome of a valve evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Verdict {
    Proceed,
    Abort { reason: String, ratio: f64 },
}

/// Evaluates a plan's delete volume against configured thresholds.
pub struct SafetyValve;

impl SafetyValve {
    pub fn evaluate(plan: &ExecutionPlan, totals: SideTotals, config: &SafetyConfig) -> Verdict {
        let deletes = plan
            .actions
            .iter()
            .filter(|a| matches!(a.kind, ActionKind::Delete | ActionKind::SoftDelete))
            .count();
        if deletes == 0 {
            return Verdict::Proceed;
        }

        // Deleting from a side reported as having no files is itself the
        // most suspicious possible plan.
        let ratio = if totals.file_count == 0 {
            1.0
        } else {
            deletes as f64 / totals.file_count as f64
        };

        if config.bypass {
            warn!(deletes, ratio, "Safety thresholds bypassed by override");
            return Verdict::Proceed;
        }

        if let Some(cap) = config.max_deletion_count {
            if deletes > cap {
                let reason = format!("{deletes} deletions exceed the absolute cap of {cap}");
                warn!(deletes, cap, "Safety valve abort");
                return Verdict::Abort { reason, ratio };
            }
        }

        if ratio > config.max_deletion_ratio {
            let reason = format!(
                "deletion ratio {ratio:.2} exceeds the configured maximum {:.2} \
                 ({deletes} of {} files)",
                config.max_deletion_ratio, totals.file_count
            );
            warn!(deletes, ratio, "Safety valve abort");
            return Verdict::Abort { reason, ratio };
        }

        info!(deletes, ratio, "Safety valve passed");
        Verdict::Proceed
    }
}
