//! Deterministic embedding providers shared by the retrieval and app-server tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use saathi_embeddings::{
    Embedding, EmbeddingError, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse,
};

/// Embeds text as a hashed bag of bytes and byte positions.
///
/// Identical text always yields an identical vector, so a document's own text
/// is its nearest neighbor at distance zero.
pub struct CharProvider {
    available: bool,
}

impl CharProvider {
    pub const DIMENSION: usize = 32;

    pub fn new() -> Self {
        Self { available: true }
    }

    /// A provider that reports a missing credential.
    pub fn without_credential() -> Self {
        Self { available: false }
    }

    pub fn vectorize(text: &str) -> Embedding {
        let mut v = vec![0.0f32; Self::DIMENSION];
        for (i, b) in text.bytes().enumerate() {
            v[usize::from(b) % Self::DIMENSION] += 1.0;
            v[(i * 31 + usize::from(b)) % Self::DIMENSION] += 0.5;
        }
        v
    }
}

impl Default for CharProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for CharProvider {
    fn name(&self) -> &str {
        "char"
    }

    fn default_model(&self) -> &str {
        "char-bag"
    }

    fn default_dimension(&self) -> usize {
        Self::DIMENSION
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> saathi_embeddings::Result<EmbeddingResponse> {
        if !self.available {
            return Err(EmbeddingError::ProviderAuthMissing);
        }
        let embedding = Self::vectorize(&request.text);
        Ok(EmbeddingResponse {
            dimension: embedding.len(),
            embedding,
            model: self.default_model().to_string(),
        })
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// A provider whose model never finishes warming up.
///
/// Optionally answers the first few calls like [`CharProvider`].
pub struct FailingProvider {
    successes: usize,
    calls: AtomicUsize,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self::succeeding_first(0)
    }

    /// Answer the first `n` calls, then fail forever.
    pub fn succeeding_first(n: usize) -> Self {
        Self {
            successes: n,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FailingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn default_model(&self) -> &str {
        "char-bag"
    }

    fn default_dimension(&self) -> usize {
        CharProvider::DIMENSION
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> saathi_embeddings::Result<EmbeddingResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.successes {
            let embedding = CharProvider::vectorize(&request.text);
            return Ok(EmbeddingResponse {
                dimension: embedding.len(),
                embedding,
                model: self.default_model().to_string(),
            });
        }
        Err(EmbeddingError::ModelLoading {
            estimated_time_secs: Some(20.0),
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
