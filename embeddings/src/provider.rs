//! Embedding providers.
//!
//! Supports the Hugging Face inference API (feature extraction pipeline) and
//! the OpenAI embeddings API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Environment variable holding the Hugging Face credential.
pub const HF_TOKEN_ENV: &str = "HF_API_TOKEN";

/// Environment variable holding the OpenAI credential.
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// Request for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed.
    pub text: String,

    /// Model to use (provider-specific).
    pub model: Option<String>,
}

impl EmbeddingRequest {
    /// Create a new embedding request.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Response from embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The generated embedding.
    pub embedding: Embedding,

    /// Model used to generate the embedding.
    pub model: String,

    /// Dimension of the embedding.
    pub dimension: usize,
}

impl EmbeddingResponse {
    fn new(embedding: Embedding, model: impl Into<String>) -> Self {
        let dimension = embedding.len();
        Self {
            embedding,
            model: model.into(),
            dimension,
        }
    }
}

/// Trait for embedding providers.
///
/// Implementations make exactly one remote call per `embed`; retry and
/// fallback belong to [`crate::EmbeddingClient`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Get the default embedding dimension.
    fn default_dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Check if the provider is available (credential set, etc.).
    fn is_available(&self) -> bool;
}

fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

fn read_credential(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Hugging Face inference API provider.
pub struct HuggingFaceProvider {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
    default_model: String,
}

impl HuggingFaceProvider {
    /// Create a provider reading its credential from [`HF_TOKEN_ENV`].
    pub fn new() -> Self {
        Self {
            api_key: read_credential(HF_TOKEN_ENV),
            base_url: "https://api-inference.huggingface.co/pipeline/feature-extraction"
                .to_string(),
            client: reqwest::Client::new(),
            default_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
        }
    }

    /// Read the credential from a different environment variable.
    pub fn with_api_key_env(mut self, var: &str) -> Self {
        self.api_key = read_credential(var);
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Drop any configured credential.
    pub fn without_api_key(mut self) -> Self {
        self.api_key = None;
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = http_client(Some(timeout))?;
        Ok(self)
    }
}

impl Default for HuggingFaceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "hugging_face"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn default_dimension(&self) -> usize {
        match self.default_model.as_str() {
            "sentence-transformers/all-mpnet-base-v2" => 768,
            "BAAI/bge-large-en-v1.5" => 1024,
            _ => 384,
        }
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderAuthMissing)?;

        let model = request.model.unwrap_or_else(|| self.default_model.clone());

        debug!("Requesting feature extraction from model: {model}");

        let response = self
            .client
            .post(format!("{}/{model}", self.base_url))
            .bearer_auth(api_key)
            .json(&serde_json::json!({ "inputs": request.text }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_unavailable(&body));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = response.json().await?;
        let embedding = parse_feature_extraction(value)?;

        debug!("Generated embedding with {} dimensions", embedding.len());

        Ok(EmbeddingResponse::new(embedding, model))
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Body of a Hugging Face 503 while the model loads.
#[derive(Debug, Deserialize)]
struct LoadingBody {
    #[serde(default)]
    error: String,
    estimated_time: Option<f64>,
}

fn classify_unavailable(body: &str) -> EmbeddingError {
    match serde_json::from_str::<LoadingBody>(body) {
        Ok(loading)
            if loading.estimated_time.is_some()
                || loading.error.to_ascii_lowercase().contains("loading") =>
        {
            EmbeddingError::ModelLoading {
                estimated_time_secs: loading.estimated_time,
            }
        }
        _ => EmbeddingError::Api {
            status: 503,
            body: body.to_string(),
        },
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureShape {
    Flat(Vec<f32>),
    Batched(Vec<Vec<f32>>),
}

/// Normalise a feature-extraction payload of shape `[D]` or `[1, D]` to `[D]`.
pub fn parse_feature_extraction(value: serde_json::Value) -> Result<Embedding> {
    let shape: FeatureShape = serde_json::from_value(value).map_err(|e| {
        EmbeddingError::InvalidResponse(format!("unexpected embedding shape: {e}"))
    })?;

    let embedding = match shape {
        FeatureShape::Flat(v) => v,
        FeatureShape::Batched(mut rows) if rows.len() == 1 => rows.swap_remove(0),
        FeatureShape::Batched(rows) => {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected a single embedding row, got {}",
                rows.len()
            )));
        }
    };

    if embedding.is_empty() {
        return Err(EmbeddingError::InvalidResponse(
            "empty embedding".to_string(),
        ));
    }

    Ok(embedding)
}

/// OpenAI embedding provider.
pub struct OpenAIProvider {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
    default_model: String,
}

impl OpenAIProvider {
    /// Create a provider reading its credential from [`OPENAI_KEY_ENV`].
    pub fn new() -> Self {
        Self {
            api_key: read_credential(OPENAI_KEY_ENV),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            default_model: "text-embedding-3-small".to_string(),
        }
    }

    /// Read the credential from a different environment variable.
    pub fn with_api_key_env(mut self, var: &str) -> Self {
        self.api_key = read_credential(var);
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = http_client(Some(timeout))?;
        Ok(self)
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn default_dimension(&self) -> usize {
        match self.default_model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        }
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderAuthMissing)?;

        let model = request.model.unwrap_or_else(|| self.default_model.clone());

        debug!("Generating embedding with model: {model}");

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&serde_json::json!({
                "input": request.text,
                "model": model
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result: OpenAIEmbeddingResponse = response.json().await?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))?
            .embedding;

        Ok(EmbeddingResponse::new(embedding, result.model))
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}
