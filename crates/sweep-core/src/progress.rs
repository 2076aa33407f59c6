//! Progress events emitted toward the caller/UI.
//!
//! Engines push snapshots into an unbounded channel so a slow consumer can
//! never block scanning or execution; the outer layer polls or subscribes
//! at its own pace. A disabled sink drops every event.

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Scan-phase snapshot, emitted after every provider page.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanProgress {
    pub folders: usize,
    pub files: usize,
    pub elapsed_ms: u64,
    /// Items per second over the whole scan so far.
    pub rate: u64,
}

/// Comparison-phase snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CompareProgress {
    pub left_files: usize,
    pub right_files: usize,
    pub compared: usize,
    pub total: usize,
}

/// Execution-phase snapshot, emitted after every action.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecuteProgress {
    pub deleted: usize,
    pub copied: usize,
    pub skipped: usize,
    pub errors: usize,
    pub percent: f64,
    pub current_path: String,
    pub elapsed_ms: u64,
    /// Actions per second over the whole run so far.
    pub rate: u64,
}

/// One progress event.
#[derive(Debug, Clone, Serialize)]
pub enum ProgressEvent {
    Scan(ScanProgress),
    Compare(CompareProgress),
    Execute(ExecuteProgress),
}

/// Handle engines emit progress through.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    /// A sink that discards every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// A connected sink plus the receiving end for the outer layer.
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Emit an event; a closed or absent receiver is ignored.
    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
