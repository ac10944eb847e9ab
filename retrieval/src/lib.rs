//! # Retrieval Engine
//!
//! This crate provides the retrieval-augmented query engine behind DigiSaathi:
//!
//! - **Semantic Index**: Write-once, in-memory nearest-neighbor index over a
//!   small corpus of sentences
//! - **Query Handling**: Top-k matches, optionally turned into an LLM answer
//! - **Configuration**: TOML-backed settings with credentials from the
//!   environment
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Query Engine                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  handle_query(text)                                             │
//! │        │                                                        │
//! │        ▼                                                        │
//! │  ┌──────────────┐   embed   ┌──────────────┐                    │
//! │  │   Semantic   │ ────────► │  Embedding   │ ──► provider API   │
//! │  │    Index     │           │    Client    │                    │
//! │  └──────────────┘           └──────────────┘                    │
//! │        │ top-k texts                                            │
//! │        ▼                                                        │
//! │  ┌──────────────┐                                               │
//! │  │  Generator   │ ──► hosted LLM (optional)                     │
//! │  └──────────────┘                                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use saathi_retrieval::{QueryEngine, RetrievalConfig};
//!
//! let engine = QueryEngine::from_config(&RetrievalConfig::default())?;
//! engine.build_index().await?;
//!
//! let response = engine.handle_query("How do I pay with UPI?").await?;
//! ```

pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod generation;
pub mod index;

pub use config::{
    EmbeddingConfig, EmbeddingProviderType, GenerationConfig, QueryConfig, RetrievalConfig,
};
pub use corpus::{Corpus, Document, default_corpus};
pub use engine::{EngineStats, QueryEngine, QueryEngineBuilder, QueryResponse};
pub use error::{Result, RetrievalError};
pub use generation::{Generator, OpenAIChatGenerator, build_prompt};
pub use index::{BuildReport, IndexState, Match, MatchResult, SemanticIndex};

// Re-export from dependencies for convenience
pub use saathi_embeddings::{
    DistanceMetric, EmbeddingClient, EmbeddingError, EmbeddingProvider, FallbackMode, RetryPolicy,
};
