//! Retrieval-augmented query engine.

use std::sync::Arc;
use std::time::Duration;

use saathi_embeddings::{
    DistanceMetric, EmbeddingClient, EmbeddingProvider, HuggingFaceProvider, OpenAIProvider,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{EmbeddingConfig, EmbeddingProviderType, GenerationConfig, RetrievalConfig};
use crate::error::{Result, RetrievalError};
use crate::generation::{Generator, OpenAIChatGenerator, build_prompt};
use crate::index::{BuildReport, IndexState, SemanticIndex};

/// Answer to a query: the matched texts, or a generated answer with its sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Answer { answer: String, matches: Vec<String> },
    Matches { matches: Vec<String> },
}

impl QueryResponse {
    pub fn matches(&self) -> &[String] {
        match self {
            Self::Answer { matches, .. } | Self::Matches { matches } => matches,
        }
    }

    /// Text to show a user: the answer, or the matches one per line.
    pub fn display_text(&self) -> String {
        match self {
            Self::Answer { answer, .. } => answer.clone(),
            Self::Matches { matches } => matches.join("\n"),
        }
    }
}

/// Query engine owning a semantic index and an optional generator.
///
/// The engine is explicitly constructed and shared (usually behind an `Arc`)
/// with whatever serves queries. [`QueryEngine::build_index`] must complete
/// before queries succeed.
pub struct QueryEngine {
    index: SemanticIndex,
    generator: Option<Arc<dyn Generator>>,
    system_prompt: String,
    top_k: usize,
    timeout: Option<Duration>,
    corpus: Vec<String>,
}

impl QueryEngine {
    /// Create a new query engine builder.
    pub fn builder(client: EmbeddingClient) -> QueryEngineBuilder {
        QueryEngineBuilder::new(client)
    }

    /// Wire providers, index and generator from configuration.
    ///
    /// Credentials are read from the process environment. A missing embedding
    /// credential is not an error: the client runs in degraded mode when
    /// fallback is enabled.
    pub fn from_config(config: &RetrievalConfig) -> Result<Self> {
        let provider = embedding_provider(&config.embedding)?;
        info!(
            provider = provider.name(),
            model = config
                .embedding
                .model
                .as_deref()
                .unwrap_or(provider.default_model()),
            available = provider.is_available(),
            "Configured embedding provider"
        );

        let mut client = EmbeddingClient::new(provider)
            .with_retry(config.retry)
            .with_fallback(config.embedding.fallback);
        if let Some(model) = &config.embedding.model {
            client = client.with_model(model.clone());
        }
        if let Some(dimension) = config.embedding.fallback_dimension {
            client = client.with_fallback_dimension(dimension);
        }

        let mut builder = Self::builder(client)
            .with_metric(config.query.metric)
            .with_top_k(config.query.top_k)
            .with_corpus(config.corpus.clone());
        if let Some(secs) = config.query.timeout_secs {
            builder = builder.with_timeout(Duration::from_secs(secs));
        }
        if let Some(generator) = generator(&config.generation)? {
            builder = builder
                .with_generator(generator)
                .with_system_prompt(config.generation.system_prompt.clone());
        }

        Ok(builder.build())
    }

    /// Embed the configured corpus and move the index to `Ready`.
    pub async fn build_index(&self) -> Result<BuildReport> {
        self.index.build(self.corpus.iter().cloned()).await
    }

    pub fn index(&self) -> &SemanticIndex {
        &self.index
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_ready()
    }

    pub fn generation_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Texts of the `k` documents closest to `text`.
    pub async fn retrieve(&self, text: &str, k: usize) -> Result<Vec<String>> {
        let result = self.index.search(text, k).await?;
        Ok(result
            .matches
            .iter()
            .filter_map(|m| self.index.text(m.document_id))
            .map(str::to_string)
            .collect())
    }

    /// Answer a user query.
    ///
    /// Returns the top matches, or a generated answer when a generator is
    /// configured. The whole call is bounded by the configured timeout.
    pub async fn handle_query(&self, text: &str) -> Result<QueryResponse> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.answer(text))
                .await
                .map_err(|_| RetrievalError::Timeout(limit))?,
            None => self.answer(text).await,
        }
    }

    async fn answer(&self, text: &str) -> Result<QueryResponse> {
        debug!("Processing query: {text}");

        let matches = self.retrieve(text, self.top_k).await?;

        let Some(generator) = &self.generator else {
            return Ok(QueryResponse::Matches { matches });
        };

        let prompt = build_prompt(&self.system_prompt, &matches, text);
        let answer = generator.generate(&prompt).await?;
        debug!(generator = generator.name(), "Generated answer");

        Ok(QueryResponse::Answer { answer, matches })
    }

    /// Get engine statistics.
    pub fn stats(&self) -> EngineStats {
        let corpus = self.index.corpus();
        EngineStats {
            state: self.index.state(),
            documents: corpus.map_or(0, |c| c.len()),
            fallback_documents: corpus.map_or(0, |c| c.fallback_ids().len()),
            dimension: corpus.map(|c| c.dimension()),
            provider: self.index.client().provider_name().to_string(),
            degraded: self.index.client().is_degraded(),
            generation_enabled: self.generation_enabled(),
        }
    }
}

fn embedding_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderType::HuggingFace => {
            let mut p = HuggingFaceProvider::new();
            if let Some(var) = &config.api_key_env {
                p = p.with_api_key_env(var);
            }
            if let Some(url) = &config.base_url {
                p = p.with_base_url(url.clone());
            }
            if let Some(model) = &config.model {
                p = p.with_model(model.clone());
            }
            Arc::new(p.with_timeout(timeout)?)
        }
        EmbeddingProviderType::OpenAI => {
            let mut p = OpenAIProvider::new();
            if let Some(var) = &config.api_key_env {
                p = p.with_api_key_env(var);
            }
            if let Some(url) = &config.base_url {
                p = p.with_base_url(url.clone());
            }
            if let Some(model) = &config.model {
                p = p.with_model(model.clone());
            }
            Arc::new(p.with_timeout(timeout)?)
        }
    };
    Ok(provider)
}

fn generator(config: &GenerationConfig) -> Result<Option<Arc<dyn Generator>>> {
    if !config.enabled {
        return Ok(None);
    }
    let generator = OpenAIChatGenerator::from_config(config)?;
    Ok(Some(Arc::new(generator)))
}

/// Builder for [`QueryEngine`].
pub struct QueryEngineBuilder {
    client: EmbeddingClient,
    metric: DistanceMetric,
    generator: Option<Arc<dyn Generator>>,
    system_prompt: String,
    top_k: usize,
    timeout: Option<Duration>,
    corpus: Vec<String>,
}

impl QueryEngineBuilder {
    /// Create a new builder.
    pub fn new(client: EmbeddingClient) -> Self {
        let defaults = RetrievalConfig::default();
        Self {
            client,
            metric: defaults.query.metric,
            generator: None,
            system_prompt: defaults.generation.system_prompt,
            top_k: defaults.query.top_k,
            timeout: None,
            corpus: defaults.corpus,
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Turn matches into generated answers.
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Bound every `handle_query` call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sentences indexed by `build_index`.
    pub fn with_corpus<I, S>(mut self, corpus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.corpus = corpus.into_iter().map(Into::into).collect();
        self
    }

    /// Build the engine. The index starts `Uninitialized`.
    pub fn build(self) -> QueryEngine {
        QueryEngine {
            index: SemanticIndex::new(self.client).with_metric(self.metric),
            generator: self.generator,
            system_prompt: self.system_prompt,
            top_k: self.top_k,
            timeout: self.timeout,
            corpus: self.corpus,
        }
    }
}

/// Statistics about the query engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Index lifecycle state.
    pub state: IndexState,

    /// Number of indexed documents.
    pub documents: usize,

    /// Number of documents indexed with fallback vectors.
    pub fallback_documents: usize,

    /// Vector dimension, once built.
    pub dimension: Option<usize>,

    /// Embedding provider name.
    pub provider: String,

    /// Whether the embedding client runs on fallback vectors only.
    pub degraded: bool,

    /// Whether answers are generated.
    pub generation_enabled: bool,
}
