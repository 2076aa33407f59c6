//! Error types for sweep-core

use sweep_provider::ProviderError;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core.
///
/// Transient provider failures are retried internally and never appear
/// here; per-item execution failures are carried in
/// [`crate::ExecutionSummary::errors`] instead of aborting the batch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("safety valve aborted the batch: {reason} (deletion ratio {ratio:.2})")]
    SafetyAborted { reason: String, ratio: f64 },

    #[error("operation cancelled")]
    Cancelled,
}
