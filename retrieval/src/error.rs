//! Error types for the retrieval engine.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval engine.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] saathi_embeddings::EmbeddingError),

    /// Search was called before the index finished building.
    #[error("index not ready")]
    IndexNotReady,

    /// Build was called on an index that has already been built.
    #[error("index already built")]
    AlreadyBuilt,

    /// Generation call failed.
    #[error("generation error: {0}")]
    Generation(String),

    /// The whole query exceeded its time budget.
    #[error("query timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RetrievalError {
    /// Whether the embedding for the query could not be produced.
    pub fn is_embedding_unavailable(&self) -> bool {
        matches!(self, Self::Embedding(e) if e.is_unavailable())
    }
}
