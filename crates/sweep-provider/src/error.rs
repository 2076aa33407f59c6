//! Error types for sweep-provider

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors reported by a file provider.
///
/// The split between `Transient` and `Permanent` drives retry behavior in
/// the core: transient failures (timeouts, rate-limit signals) are retried
/// with backoff, permanent failures are not.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("transient provider failure at {path}: {message}")]
    Transient { path: String, message: String },

    #[error("permanent provider failure at {path}: {message}")]
    Permanent { path: String, message: String },

    #[error("path not found: {path}")]
    NotFound { path: String },

    #[error("operation not supported by provider: {operation}")]
    Unsupported { operation: String },
}

impl ProviderError {
    pub fn transient(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn permanent(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Permanent {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Whether the failure is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
