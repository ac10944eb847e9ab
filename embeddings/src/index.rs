//! Flat (brute-force) vector index.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::DistanceMetric;

/// A single nearest-neighbor hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Position of the vector in insertion order.
    pub id: usize,

    /// Distance to the query under the index metric.
    pub distance: f32,
}

/// An exhaustive nearest-neighbor index.
///
/// Vectors are identified by insertion order. Every search compares the query
/// against every stored vector, so results are exact.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Vec<Embedding>,
    dimension: usize,
    metric: DistanceMetric,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimension` floats.
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Vec::new(),
            dimension,
            metric: DistanceMetric::default(),
        }
    }

    /// Use a different distance metric.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Append a vector and return its id.
    pub fn add(&mut self, embedding: Embedding) -> Result<usize> {
        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let id = self.vectors.len();
        self.vectors.push(embedding);
        debug!("Added vector {id} to flat index");
        Ok(id)
    }

    /// Get a stored vector by id.
    pub fn get(&self, id: usize) -> Option<&Embedding> {
        self.vectors.get(id)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Return the `k` stored vectors closest to `query`.
    ///
    /// Results are sorted by ascending distance, ties broken by ascending id.
    /// `k` larger than the index is clamped; an empty index yields no hits.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let k = k.min(self.vectors.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(OrderedFloat<f32>, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, vector)| {
                self.metric
                    .distance(query, vector)
                    .map(|d| (OrderedFloat(d), id))
            })
            .collect::<Result<_>>()?;

        if k < scored.len() {
            scored.select_nth_unstable(k - 1);
            scored.truncate(k);
        }
        scored.sort_unstable();

        Ok(scored
            .into_iter()
            .map(|(distance, id)| Neighbor {
                id,
                distance: distance.0,
            })
            .collect())
    }
}
