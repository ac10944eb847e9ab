//! Semantic index over a write-once corpus.
//!
//! The index moves through `Uninitialized -> Building -> Ready` exactly once.
//! Once `Ready`, the corpus is published behind a [`OnceLock`] and every
//! search reads it without locking, so searches may run concurrently.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use saathi_embeddings::{DistanceMetric, EmbeddedText, EmbeddingClient, EmbeddingError, FlatIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::corpus::{Corpus, Document};
use crate::error::{Result, RetrievalError};

/// Lifecycle of a [`SemanticIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    Uninitialized,
    Building,
    Ready,
}

impl IndexState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Building,
            2 => Self::Ready,
            _ => Self::Uninitialized,
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub document_id: usize,
    pub distance: f32,
}

/// Hits ordered by ascending distance, ties by ascending document id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matches: Vec<Match>,

    /// True when the query vector was a fallback.
    pub query_is_fallback: bool,
}

impl MatchResult {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn document_ids(&self) -> Vec<usize> {
        self.matches.iter().map(|m| m.document_id).collect()
    }
}

/// Summary of a completed build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Number of indexed documents.
    pub documents: usize,

    /// Vector dimension of the index.
    pub dimension: usize,

    /// Documents whose vectors are fallbacks.
    pub fallback_ids: Vec<usize>,
}

struct ReadyIndex {
    corpus: Corpus,
    vectors: FlatIndex,
}

/// In-memory nearest-neighbor index over a corpus of sentences.
pub struct SemanticIndex {
    client: EmbeddingClient,
    metric: DistanceMetric,
    state: AtomicU8,
    ready: OnceLock<ReadyIndex>,
}

impl SemanticIndex {
    /// Create an unbuilt index that embeds through `client`.
    pub fn new(client: EmbeddingClient) -> Self {
        Self {
            client,
            metric: DistanceMetric::default(),
            state: AtomicU8::new(IndexState::Uninitialized as u8),
            ready: OnceLock::new(),
        }
    }

    /// Use a different distance metric.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn state(&self) -> IndexState {
        IndexState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == IndexState::Ready
    }

    pub fn client(&self) -> &EmbeddingClient {
        &self.client
    }

    /// The built corpus, once ready.
    pub fn corpus(&self) -> Option<&Corpus> {
        self.ready.get().map(|r| &r.corpus)
    }

    /// Text of a document, once ready.
    pub fn text(&self, id: usize) -> Option<&str> {
        self.corpus()?.get(id).map(|d| d.text.as_str())
    }

    /// Embed every document and publish the index.
    ///
    /// A document whose embedding fails gets a fallback vector instead; the
    /// build itself never fails because of embedding errors. Calling `build`
    /// more than once returns [`RetrievalError::AlreadyBuilt`].
    pub async fn build<I, S>(&self, documents: I) -> Result<BuildReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .compare_exchange(
                IndexState::Uninitialized as u8,
                IndexState::Building as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| RetrievalError::AlreadyBuilt)?;

        let texts: Vec<String> = documents.into_iter().map(Into::into).collect();
        info!("Building semantic index over {} documents", texts.len());

        match self.assemble(texts).await {
            Ok(ready) => {
                let report = BuildReport {
                    documents: ready.corpus.len(),
                    dimension: ready.corpus.dimension(),
                    fallback_ids: ready.corpus.fallback_ids(),
                };
                // The state machine admits a single builder, so this cannot be set yet.
                let _ = self.ready.set(ready);
                self.state.store(IndexState::Ready as u8, Ordering::Release);

                if report.fallback_ids.is_empty() {
                    info!(
                        documents = report.documents,
                        dimension = report.dimension,
                        "Semantic index ready"
                    );
                } else {
                    warn!(
                        documents = report.documents,
                        dimension = report.dimension,
                        fallback = ?report.fallback_ids,
                        "Semantic index ready with fallback vectors"
                    );
                }
                Ok(report)
            }
            Err(err) => {
                self.state
                    .store(IndexState::Uninitialized as u8, Ordering::Release);
                Err(err)
            }
        }
    }

    async fn assemble(&self, texts: Vec<String>) -> Result<ReadyIndex> {
        let mut embedded: Vec<Option<EmbeddedText>> = Vec::with_capacity(texts.len());
        let mut dimension: Option<usize> = None;

        for (id, text) in texts.iter().enumerate() {
            match self.client.embed(text).await {
                Ok(e) if dimension.is_none_or(|d| d == e.dimension()) => {
                    dimension.get_or_insert(e.dimension());
                    embedded.push(Some(e));
                }
                Ok(e) => {
                    warn!(
                        document = id,
                        expected = dimension.unwrap_or_default(),
                        actual = e.dimension(),
                        "Embedding dimension differs from index, substituting fallback"
                    );
                    embedded.push(None);
                }
                Err(err) => {
                    warn!(document = id, "Embedding failed, substituting fallback: {err}");
                    embedded.push(None);
                }
            }
        }

        let dimension = dimension.unwrap_or_else(|| self.client.expected_dimension());

        let mut vectors = FlatIndex::new(dimension).with_metric(self.metric);
        let mut documents = Vec::with_capacity(texts.len());
        for (text, slot) in texts.into_iter().zip(embedded) {
            let e = slot.unwrap_or_else(|| self.client.fallback_for(&text, dimension));
            let id = vectors.add(e.vector.clone())?;
            documents.push(Document {
                id,
                text,
                vector: e.vector,
                is_fallback: e.is_fallback,
            });
        }

        Ok(ReadyIndex {
            corpus: Corpus::new(documents, dimension),
            vectors,
        })
    }

    /// Return the `k` documents closest to `query_text`.
    ///
    /// `k` is clamped to the corpus size; an empty corpus or `k == 0` yields
    /// an empty result without embedding the query.
    pub async fn search(&self, query_text: &str, k: usize) -> Result<MatchResult> {
        let ready = match (self.state(), self.ready.get()) {
            (IndexState::Ready, Some(ready)) => ready,
            _ => return Err(RetrievalError::IndexNotReady),
        };

        if ready.vectors.is_empty() || k == 0 {
            return Ok(MatchResult::default());
        }

        let query = self.embed_query(query_text, ready.vectors.dimension()).await?;
        let neighbors = ready.vectors.search(&query.vector, k)?;

        debug!(
            k,
            hits = neighbors.len(),
            fallback = query.is_fallback,
            "Searched semantic index"
        );

        Ok(MatchResult {
            matches: neighbors
                .into_iter()
                .map(|n| Match {
                    document_id: n.id,
                    distance: n.distance,
                })
                .collect(),
            query_is_fallback: query.is_fallback,
        })
    }

    async fn embed_query(&self, text: &str, dimension: usize) -> Result<EmbeddedText> {
        let fallback_enabled = self.client.fallback_mode().is_enabled();

        match self.client.embed(text).await {
            Ok(e) if e.dimension() == dimension => Ok(e),
            Ok(e) if fallback_enabled => {
                warn!(
                    expected = dimension,
                    actual = e.dimension(),
                    "Query embedding dimension differs from index, using fallback"
                );
                Ok(self.client.fallback_for(text, dimension))
            }
            Ok(e) => Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: e.dimension(),
            }
            .into()),
            Err(err) if fallback_enabled => {
                warn!("Query embedding failed, using fallback: {err}");
                Ok(self.client.fallback_for(text, dimension))
            }
            Err(err) => Err(err.into()),
        }
    }
}
