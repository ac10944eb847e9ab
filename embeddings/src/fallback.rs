//! Synthetic embeddings used when no live vector can be produced.
//!
//! A fallback vector is arbitrary but deterministic: the same text and
//! dimension always produce the same unit-length vector, so a degraded index
//! is still self-consistent.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Embedding;
use crate::similarity::normalize;

/// Whether synthetic vectors may stand in for live embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Substitute a fallback vector and flag it.
    #[default]
    Enabled,
    /// Surface the failure to the caller.
    Disabled,
}

impl FallbackMode {
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Produce the fallback vector for `text`.
pub fn fallback_embedding(text: &str, dimension: usize) -> Embedding {
    let digest = Sha256::digest(text.as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    let mut rng = StdRng::from_seed(seed);

    let mut embedding: Embedding = (0..dimension)
        .map(|_| rng.random_range(-1.0f32..1.0))
        .collect();
    normalize(&mut embedding);
    embedding
}
