//! Configuration for the retrieval engine.

use std::path::Path;

use saathi_embeddings::{DistanceMetric, FallbackMode, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::corpus::default_corpus;
use crate::error::Result;

/// Configuration for the retrieval engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Retry policy for embedding calls.
    pub retry: RetryPolicy,

    /// Query processing configuration.
    pub query: QueryConfig,

    /// Answer generation configuration.
    pub generation: GenerationConfig,

    /// Sentences indexed at startup.
    pub corpus: Vec<String>,
}

impl RetrievalConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            retry: RetryPolicy::default(),
            query: QueryConfig::default(),
            generation: GenerationConfig::default(),
            corpus: default_corpus(),
        }
    }

    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the query configuration.
    pub fn with_query(mut self, config: QueryConfig) -> Self {
        self.query = config;
        self
    }

    /// Set the generation configuration.
    pub fn with_generation(mut self, config: GenerationConfig) -> Self {
        self.generation = config;
        self
    }

    /// Replace the corpus.
    pub fn with_corpus<I, S>(mut self, corpus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.corpus = corpus.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model to use for embeddings (provider default when unset).
    pub model: Option<String>,

    /// Override for the provider API base URL.
    pub base_url: Option<String>,

    /// Environment variable holding the credential (provider default when unset).
    pub api_key_env: Option<String>,

    /// Per-attempt request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Whether fallback vectors may stand in for failed embeddings.
    pub fallback: FallbackMode,

    /// Dimension of fallback vectors when no live vector has been seen.
    pub fallback_dimension: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::HuggingFace,
            model: None,
            base_url: None,
            api_key_env: None,
            request_timeout_secs: 10,
            fallback: FallbackMode::Enabled,
            fallback_dimension: None,
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// Hugging Face inference API (feature extraction).
    HuggingFace,
    /// OpenAI embeddings API.
    #[serde(rename = "openai")]
    OpenAI,
}

/// Configuration for query processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Number of documents retrieved per query.
    pub top_k: usize,

    /// Distance metric used by the index.
    pub metric: DistanceMetric,

    /// Upper bound on a whole query, in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            metric: DistanceMetric::L2,
            timeout_secs: None,
        }
    }
}

/// Configuration for answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Whether matched documents are turned into a generated answer.
    pub enabled: bool,

    /// Chat model to use.
    pub model: String,

    /// API base URL.
    pub base_url: String,

    /// Environment variable holding the credential.
    pub api_key_env: String,

    /// Completion request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Framing placed at the top of every prompt.
    pub system_prompt: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_secs: 60,
            system_prompt: "You are DigiSaathi, an assistant for questions about digital \
                            technologies. Answer using only the context below."
                .to_string(),
        }
    }
}
