//! # Embeddings
//!
//! This crate turns text into vectors and searches over them for the
//! DigiSaathi retrieval core.
//!
//! ## Features
//!
//! - **Embedding Generation**: Hugging Face and OpenAI providers behind one trait
//! - **Resilience**: Exponential backoff on transient provider failures
//! - **Degraded Mode**: Deterministic, flagged fallback vectors when no
//!   credential is configured
//! - **Flat Index**: Exact top-k search under L2, cosine or inner-product distance
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingClient ──► EmbeddingProvider ──► HuggingFace/OpenAI   │
//! │       │    │                                                    │
//! │       │    └──► RetryPolicy / fallback_embedding                │
//! │       ▼                                                         │
//! │  EmbeddedText ──► FlatIndex ──► Neighbor                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod error;
pub mod fallback;
pub mod index;
pub mod provider;
pub mod retry;
pub mod similarity;

pub use client::{EmbeddedText, EmbeddingClient};
pub use error::{EmbeddingError, Result};
pub use fallback::{FallbackMode, fallback_embedding};
pub use index::{FlatIndex, Neighbor};
pub use provider::{
    EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, HuggingFaceProvider, OpenAIProvider,
};
pub use retry::RetryPolicy;
pub use similarity::{DistanceMetric, cosine_similarity, squared_euclidean};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
