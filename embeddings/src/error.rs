//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// No provider credential is configured.
    #[error("embedding provider credential missing")]
    ProviderAuthMissing,

    /// Timeout or connection failure talking to the provider.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The provider is still loading the model.
    #[error("model is warming up (estimated {estimated_time_secs:?}s)")]
    ModelLoading { estimated_time_secs: Option<f64> },

    /// The provider answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Retries exhausted, or the failure was not retryable.
    #[error("embedding unavailable after {attempts} attempt(s): {source}")]
    EmbeddingUnavailable {
        attempts: u32,
        #[source]
        source: Box<EmbeddingError>,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error that is not a timeout or connection failure.
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),
}

impl EmbeddingError {
    /// Whether the failure is worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::ModelLoading { .. })
    }

    /// Whether this is the terminal `EmbeddingUnavailable` failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable { .. })
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Network(err)
        } else {
            Self::Http(err)
        }
    }
}
