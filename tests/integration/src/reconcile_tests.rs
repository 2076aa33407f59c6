//! End-to-end reconciliation between two roots of one provider.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use sweep_core::{
    CompareConfig, Direction, DiffReason, ProgressSink, Reconciler, RunOptions, SafetyConfig,
    Status,
};
use sweep_provider::{FileProvider, MemoryProvider};

fn mirrored_provider() -> Arc<MemoryProvider> {
    let provider = Arc::new(MemoryProvider::new());
    // Unchanged, modulo one second of timestamp skew.
    provider.add_file("/L/docs/same.txt", 100, 1_000, Some("h1"));
    provider.add_file("/R/docs/same.txt", 100, 1_001, Some("h1"));
    // Conflicting sizes.
    provider.add_file("/L/report.csv", 200, 1_000, None);
    provider.add_file("/R/report.csv", 300, 1_000, None);
    // One-sided files.
    provider.add_file("/L/new/a.txt", 10, 1_000, None);
    provider.add_file("/R/stale/b.txt", 10, 1_000, None);
    provider
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_pushes_and_prunes() {
    let provider = mirrored_provider();
    let config = CompareConfig {
        safety: SafetyConfig {
            max_deletion_ratio: 1.0,
            ..SafetyConfig::default()
        },
        ..CompareConfig::default()
    };

    let reconciler = Reconciler::new(Arc::clone(&provider) as Arc<dyn FileProvider>, config);
    let report = reconciler
        .run(
            "/L",
            "/R",
            RunOptions::default(),
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();

    let comparison = &report.comparison;
    assert_eq!(comparison.to_copy.len(), 1);
    assert_eq!(comparison.to_copy[0].rel_path, "new/a.txt");
    assert_eq!(comparison.to_delete.len(), 1);
    assert_eq!(comparison.to_delete[0].rel_path, "stale/b.txt");
    assert_eq!(comparison.conflicts.len(), 1);
    assert_eq!(comparison.conflicts[0].reason, DiffReason::SizeMismatch);

    assert_eq!(report.summary.status, Status::Complete);
    assert_eq!(report.summary.copied, 1);
    assert_eq!(report.summary.deleted, 1);

    assert!(provider.contains_file("/R/new/a.txt"));
    assert!(!provider.contains_file("/R/stale/b.txt"));
    // Conflicts are reported, never auto-resolved.
    assert!(provider.contains_file("/L/report.csv"));
    assert!(provider.contains_file("/R/report.csv"));
    // Unchanged files are untouched.
    assert!(provider.contains_file("/R/docs/same.txt"));
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_right_to_left() {
    let provider = mirrored_provider();
    let config = CompareConfig {
        direction: Direction::RightToLeft,
        safety: SafetyConfig {
            max_deletion_ratio: 1.0,
            ..SafetyConfig::default()
        },
        ..CompareConfig::default()
    };

    let reconciler = Reconciler::new(Arc::clone(&provider) as Arc<dyn FileProvider>, config);
    let report = reconciler
        .run(
            "/L",
            "/R",
            RunOptions::default(),
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(report.comparison.to_copy[0].rel_path, "stale/b.txt");
    assert_eq!(report.comparison.to_delete[0].rel_path, "new/a.txt");
    assert!(provider.contains_file("/L/stale/b.txt"));
    assert!(!provider.contains_file("/L/new/a.txt"));
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_dry_run_changes_nothing() {
    let provider = mirrored_provider();
    let config = CompareConfig {
        safety: SafetyConfig {
            max_deletion_ratio: 1.0,
            ..SafetyConfig::default()
        },
        ..CompareConfig::default()
    };

    let reconciler = Reconciler::new(Arc::clone(&provider) as Arc<dyn FileProvider>, config);
    let report = reconciler
        .run(
            "/L",
            "/R",
            RunOptions { dry_run: true },
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(report.summary.status, Status::Complete);
    assert_eq!(report.summary.skipped, 2);
    assert_eq!(report.comparison.to_copy.len(), 1);
    assert!(provider.copied().is_empty());
    assert!(provider.trashed().is_empty());
    assert!(provider.contains_file("/R/stale/b.txt"));
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_safety_abort_preserves_target() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_folder("/L");
    provider.add_file("/R/a.txt", 1, 1_000, None);
    provider.add_file("/R/b.txt", 1, 1_000, None);
    provider.add_file("/R/c.txt", 1, 1_000, None);

    // Everything on the right would be deleted: ratio 1.0 > 0.5.
    let reconciler = Reconciler::new(
        Arc::clone(&provider) as Arc<dyn FileProvider>,
        CompareConfig::default(),
    );
    let report = reconciler
        .run(
            "/L",
            "/R",
            RunOptions::default(),
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(report.summary.status, Status::SafetyAborted);
    assert_eq!(report.summary.deleted, 0);
    assert!(provider.trashed().is_empty());
    assert!(provider.contains_file("/R/a.txt"));
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_identical_trees_is_a_no_op() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_file("/L/a.txt", 10, 1_000, Some("h"));
    provider.add_file("/R/a.txt", 10, 1_000, Some("h"));

    let reconciler = Reconciler::new(
        Arc::clone(&provider) as Arc<dyn FileProvider>,
        CompareConfig::default(),
    );
    let report = reconciler
        .run(
            "/L",
            "/R",
            RunOptions::default(),
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(report.summary.status, Status::Complete);
    assert_eq!(report.summary.copied, 0);
    assert_eq!(report.summary.deleted, 0);
    assert!(report.comparison.conflicts.is_empty());
    assert!(provider.copied().is_empty());
}
