//! llmrelay error types

use std::time::Duration;

use crate::types::ProviderName;

/// llmrelay error taxonomy.
///
/// Vendor misbehaviour never surfaces as a panic or an unhandled error: the
/// adapters turn it into a `GenerationFailure`, and the fallback handler turns
/// an exhausted plan into [`RelayError::AllProvidersExhausted`].
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    // Configuration errors (not retryable)
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("no providers configured")]
    NoProviders,

    #[error("configuration error: {0}")]
    Config(String),

    // Vendor errors
    /// HTTP/transport failure; retried in place.
    #[error("vendor error: {0}")]
    VendorTransient(String),

    /// Rate-limit signature seen; triggers immediate fallover.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Attempt latency reached the timeout threshold; triggers immediate fallover.
    #[error("{provider} timed out after {elapsed:?}")]
    Timeout {
        provider: ProviderName,
        elapsed: Duration,
    },

    // Terminal errors
    /// Every provider in the plan failed or was skipped.
    #[error("All providers failed")]
    AllProvidersExhausted { details: Vec<String> },

    #[error("request cancelled")]
    Cancelled,

    // Data errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RelayError {
    /// Whether this error should move the fallback walk to the next vendor.
    pub fn is_fallover_trigger(&self) -> bool {
        matches!(self, RelayError::RateLimited(_) | RelayError::Timeout { .. })
    }

    /// Per-attempt error strings, for [`RelayError::AllProvidersExhausted`].
    pub fn details(&self) -> &[String] {
        match self {
            RelayError::AllProvidersExhausted { details } => details,
            _ => &[],
        }
    }
}

/// Result type alias for llmrelay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
