//! End-to-end cleanup flows: scan -> classify -> plan -> valve -> execute
//! against the in-memory provider.

use std::collections::HashSet;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use sweep_core::{
    Cleaner, CleanupConfig, DeletionPlanner, EmptyFolderDetector, Error, ExecutionEngine,
    ProgressSink, RateLimiter, RunOptions, SafetyConfig, SideTotals, Status, TreeScanner,
};
use sweep_provider::{Capabilities, FileProvider, MemoryProvider};

fn lenient(config: CleanupConfig) -> CleanupConfig {
    CleanupConfig {
        safety: SafetyConfig {
            max_deletion_ratio: 10.0,
            ..SafetyConfig::default()
        },
        ..config
    }
}

fn populated_provider() -> Arc<MemoryProvider> {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_file("/A/keep/data.txt", 100, 1_000, None);
    provider.add_file("/A/keep/notes/readme.md", 50, 1_000, None);
    provider.add_file("/A/empty1/.DS_Store", 1, 1_000, None);
    provider.add_folder("/A/empty1/sub");
    provider.add_folder("/A/tmp/cache");
    provider.add_file("/A/node_modules/pkg/x.js", 10, 1_000, None);
    provider
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_removes_empty_branches_deepest_first() {
    let provider = populated_provider();
    let config = lenient(CleanupConfig {
        scan: sweep_core::ScanConfig {
            exclude_patterns: vec!["node_modules".to_string()],
            ..sweep_core::ScanConfig::default()
        },
        ..CleanupConfig::default()
    });

    let cleaner = Cleaner::new(Arc::clone(&provider) as Arc<dyn FileProvider>, config);
    let report = cleaner
        .run(
            "/A",
            RunOptions::default(),
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(report.summary.status, Status::Complete);
    assert_eq!(report.summary.deleted, 4);
    assert_eq!(report.stats.excluded_folders, 1);

    // Each depth level is a barrier; order within a level is not fixed.
    let trashed = provider.trashed();
    let deepest: HashSet<&str> = trashed[..2].iter().map(String::as_str).collect();
    let shallower: HashSet<&str> = trashed[2..].iter().map(String::as_str).collect();
    assert_eq!(
        deepest,
        HashSet::from(["/A/empty1/sub", "/A/tmp/cache"])
    );
    assert_eq!(shallower, HashSet::from(["/A/empty1", "/A/tmp"]));

    assert!(provider.contains_file("/A/keep/data.txt"));
    assert!(provider.contains_file("/A/keep/notes/readme.md"));
    assert!(provider.contains_file("/A/node_modules/pkg/x.js"));
}

#[tokio::test(start_paused = true)]
async fn test_safety_valve_blocks_suspicious_cleanup() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_file("/A/only.txt", 10, 1_000, None);
    provider.add_folder("/A/a");
    provider.add_folder("/A/b");
    provider.add_folder("/A/c");

    // 3 deletions against 1 file: ratio 3.0 > default 0.5.
    let cleaner = Cleaner::new(
        Arc::clone(&provider) as Arc<dyn FileProvider>,
        CleanupConfig::default(),
    );
    let report = cleaner
        .run(
            "/A",
            RunOptions::default(),
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(report.summary.status, Status::SafetyAborted);
    assert_eq!(report.summary.deleted, 0);
    assert!(report.summary.abort_reason.is_some());
    assert_eq!(report.empty_folders.len(), 3);
    assert!(provider.trashed().is_empty());
    assert!(provider.deleted().is_empty());
    assert!(provider.contains_folder("/A/a"));
}

#[tokio::test(start_paused = true)]
async fn test_safety_override_allows_the_batch() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_file("/A/only.txt", 10, 1_000, None);
    provider.add_folder("/A/a");
    provider.add_folder("/A/b");

    let config = CleanupConfig {
        safety: SafetyConfig {
            bypass: true,
            ..SafetyConfig::default()
        },
        ..CleanupConfig::default()
    };
    let cleaner = Cleaner::new(Arc::clone(&provider) as Arc<dyn FileProvider>, config);
    let report = cleaner
        .run(
            "/A",
            RunOptions::default(),
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(report.summary.status, Status::Complete);
    assert_eq!(report.summary.deleted, 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_write_between_scan_and_delete_is_skipped() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_file("/A/keep.txt", 10, 1_000, None);
    provider.add_folder("/A/x");

    let config = lenient(CleanupConfig::default());
    let limiter = Arc::new(RateLimiter::new(1000.0));
    let scanner = TreeScanner::new(
        Arc::clone(&provider) as Arc<dyn FileProvider>,
        Arc::clone(&limiter),
        config.scan.clone(),
    );
    let mut tree = scanner
        .scan("/A", &CancellationToken::new(), &ProgressSink::disabled())
        .await
        .unwrap();

    let detector = EmptyFolderDetector::from_config(&config);
    let report = detector.classify(&mut tree);
    assert_eq!(report.empty, vec!["/A/x".to_string()]);

    // A file lands in the scheduled folder before execution starts.
    provider.add_file("/A/x/late.txt", 1, 2_000, None);

    let schedule = DeletionPlanner::schedule(&report);
    let engine = ExecutionEngine::new(
        Arc::clone(&provider) as Arc<dyn FileProvider>,
        limiter,
        config.scan.workers,
        false,
    );
    let summary = engine
        .execute_schedule(
            "/A",
            &schedule,
            &detector,
            true,
            SideTotals {
                file_count: tree.file_count,
            },
            &config.safety,
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await;

    assert_eq!(summary.status, Status::Complete);
    assert_eq!(summary.deleted, 0);
    assert_eq!(summary.skipped, 1);
    assert!(provider.contains_file("/A/x/late.txt"));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_scan_surfaces_as_error() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_file("/A/one.txt", 1, 1_000, None);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let cleaner = Cleaner::new(
        Arc::clone(&provider) as Arc<dyn FileProvider>,
        CleanupConfig::default(),
    );
    let result = cleaner
        .run(
            "/A",
            RunOptions::default(),
            &cancel,
            &ProgressSink::disabled(),
        )
        .await;
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(provider.trashed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_acknowledged_permanent_delete_without_trash() {
    let provider = Arc::new(
        MemoryProvider::new().with_capabilities(Capabilities {
            supports_trash: false,
            supports_hash: false,
        }),
    );
    provider.add_file("/A/keep.txt", 10, 1_000, None);
    provider.add_folder("/A/x");

    let config = lenient(CleanupConfig {
        acknowledge_permanent_delete: true,
        ..CleanupConfig::default()
    });
    let cleaner = Cleaner::new(Arc::clone(&provider) as Arc<dyn FileProvider>, config);
    let report = cleaner
        .run(
            "/A",
            RunOptions::default(),
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(report.summary.status, Status::Complete);
    assert!(provider.trashed().is_empty());
    assert_eq!(provider.deleted(), vec!["/A/x".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_degraded_subtree_is_never_deleted() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_file("/A/keep.txt", 10, 1_000, None);
    provider.add_folder("/A/flaky/inner");
    provider.inject_transient("/A/flaky", 10);

    let cleaner = Cleaner::new(
        Arc::clone(&provider) as Arc<dyn FileProvider>,
        lenient(CleanupConfig::default()),
    );
    let report = cleaner
        .run(
            "/A",
            RunOptions::default(),
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();

    // The listing for /A/flaky kept failing; the subtree stays Unknown
    // and is never a deletion candidate.
    assert!(report.empty_folders.is_empty());
    assert!(provider.trashed().is_empty());
    assert!(provider.contains_folder("/A/flaky/inner"));
}
