//! Stability of the serialized report shapes consumed by exporting layers.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use sweep_core::{
    Cleaner, CleanupConfig, CompareConfig, ProgressSink, Reconciler, RunOptions, SafetyConfig,
};
use sweep_provider::{FileProvider, MemoryProvider};

#[test]
fn test_safety_config_keeps_the_override_key() {
    let config: SafetyConfig =
        serde_json::from_str(r#"{"max_deletion_ratio": 0.3, "override": true}"#).unwrap();
    assert!(config.bypass);

    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["override"], serde_json::json!(true));
    assert!(json.get("bypass").is_none());
}

#[test]
fn test_cleanup_config_accepts_flattened_scan_fields() {
    let config: CleanupConfig = serde_json::from_str(
        r#"{
            "exclude_patterns": ["node_modules", ".git"],
            "workers": 8,
            "ignore_system_files": false
        }"#,
    )
    .unwrap();
    assert_eq!(config.scan.exclude_patterns.len(), 2);
    assert_eq!(config.scan.workers, 8);
    assert!(!config.ignore_system_files);
    assert!(config.use_trash);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_report_field_layout() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_file("/A/keep.txt", 10, 1_000, None);
    provider.add_folder("/A/x");

    let cleaner = Cleaner::new(
        Arc::clone(&provider) as Arc<dyn FileProvider>,
        CleanupConfig {
            safety: SafetyConfig {
                max_deletion_ratio: 10.0,
                ..SafetyConfig::default()
            },
            ..CleanupConfig::default()
        },
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

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["root"], serde_json::json!("/A"));
    assert_eq!(json["empty_folders"], serde_json::json!(["/A/x"]));
    assert_eq!(json["stats"]["total_scanned"], serde_json::json!(2));
    assert_eq!(json["stats"]["depth_distribution"]["2"], serde_json::json!(1));
    assert_eq!(json["summary"]["deleted"], serde_json::json!(1));
    assert_eq!(json["summary"]["status"], serde_json::json!("complete"));
    assert_eq!(json["summary"]["errors"], serde_json::json!([]));
}

#[tokio::test(start_paused = true)]
async fn test_comparison_result_field_layout() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_file("/L/a.txt", 10, 1_000, None);
    provider.add_file("/L/big.bin", 200, 1_000, None);
    provider.add_file("/R/big.bin", 100, 1_000, None);
    provider.add_file("/R/b.txt", 10, 1_000, None);

    let reconciler = Reconciler::new(
        Arc::clone(&provider) as Arc<dyn FileProvider>,
        CompareConfig::default(),
    );
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

    let json = serde_json::to_value(&report.comparison).unwrap();
    assert_eq!(json["to_copy"][0]["rel_path"], serde_json::json!("a.txt"));
    assert_eq!(
        json["to_copy"][0]["reason"],
        serde_json::json!("left_only")
    );
    assert_eq!(
        json["to_delete"][0]["reason"],
        serde_json::json!("right_only")
    );
    assert_eq!(
        json["conflicts"][0]["reason"],
        serde_json::json!("size_mismatch")
    );
    assert_eq!(json["conflicts"][0]["file"]["size"], serde_json::json!(200));
    assert_eq!(json["target_file_count"], serde_json::json!(2));
}

#[tokio::test(start_paused = true)]
async fn test_aborted_summary_field_layout() {
    let provider = Arc::new(MemoryProvider::new());
    provider.add_file("/A/only.txt", 10, 1_000, None);
    provider.add_folder("/A/a");
    provider.add_folder("/A/b");

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

    let json = serde_json::to_value(&report.summary).unwrap();
    assert_eq!(json["status"], serde_json::json!("safety_aborted"));
    assert_eq!(json["abort_ratio"], serde_json::json!(2.0));
    assert!(json["abort_reason"].as_str().unwrap().contains("ratio"));
}
