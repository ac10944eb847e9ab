//! Resilient embedding client.
//!
//! Wraps an [`EmbeddingProvider`] with the retry and fallback policy:
//!
//! - transient failures (network, model warming up) are retried with
//!   exponential backoff, up to [`RetryPolicy::max_attempts`];
//! - any other failure ends the call immediately;
//! - a missing credential switches the client into degraded mode, where
//!   every call returns a fallback vector flagged as such.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::fallback::{FallbackMode, fallback_embedding};
use crate::provider::{EmbeddingProvider, EmbeddingRequest};
use crate::retry::RetryPolicy;

/// A vector together with how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedText {
    /// The embedding.
    pub vector: Embedding,

    /// True when the vector is synthetic rather than from the provider.
    pub is_fallback: bool,
}

impl EmbeddedText {
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// Client that turns text into vectors through a provider.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
    fallback: FallbackMode,
    fallback_dimension: Option<usize>,
    model: Option<String>,
}

impl EmbeddingClient {
    /// Create a client with the default retry policy and fallback enabled.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            fallback: FallbackMode::default(),
            fallback_dimension: None,
            model: None,
        }
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the fallback mode.
    pub fn with_fallback(mut self, fallback: FallbackMode) -> Self {
        self.fallback = fallback;
        self
    }

    /// Dimension of fallback vectors produced before any live vector is seen.
    /// Defaults to the provider's default dimension.
    pub fn with_fallback_dimension(mut self, dimension: usize) -> Self {
        self.fallback_dimension = Some(dimension);
        self
    }

    /// Override the provider's default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn fallback_mode(&self) -> FallbackMode {
        self.fallback
    }

    /// True when every call will be answered with a fallback vector.
    pub fn is_degraded(&self) -> bool {
        !self.provider.is_available() && self.fallback.is_enabled()
    }

    /// Dimension the provider is expected to produce.
    pub fn expected_dimension(&self) -> usize {
        self.fallback_dimension
            .unwrap_or_else(|| self.provider.default_dimension())
    }

    /// Embed `text`, falling back to a synthetic vector only when the
    /// provider has no credential and fallback is enabled.
    ///
    /// Empty text is embedded as-is. Every failure is reported as
    /// [`EmbeddingError::EmbeddingUnavailable`].
    pub async fn embed(&self, text: &str) -> Result<EmbeddedText> {
        if !self.provider.is_available() {
            if self.fallback.is_enabled() {
                warn!(
                    provider = self.provider.name(),
                    "Embedding provider credential missing, using fallback vector"
                );
                return Ok(self.fallback_for(text, self.expected_dimension()));
            }
            return Err(EmbeddingError::EmbeddingUnavailable {
                attempts: 0,
                source: Box::new(EmbeddingError::ProviderAuthMissing),
            });
        }

        let vector = self.embed_live(text).await?;
        Ok(EmbeddedText {
            vector,
            is_fallback: false,
        })
    }

    /// Fallback vector for `text` with the given dimension.
    pub fn fallback_for(&self, text: &str, dimension: usize) -> EmbeddedText {
        EmbeddedText {
            vector: fallback_embedding(text, dimension),
            is_fallback: true,
        }
    }

    async fn embed_live(&self, text: &str) -> Result<Embedding> {
        let mut attempt = 0;
        loop {
            let mut request = EmbeddingRequest::new(text);
            if let Some(model) = &self.model {
                request = request.with_model(model.clone());
            }

            match self.provider.embed(request).await {
                Ok(response) => {
                    debug!(
                        attempt,
                        dimension = response.dimension,
                        "Embedding produced"
                    );
                    return Ok(response.embedding);
                }
                Err(err) if err.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Transient embedding failure, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(EmbeddingError::EmbeddingUnavailable {
                        attempts: attempt + 1,
                        source: Box::new(err),
                    });
                }
            }
        }
    }
}
