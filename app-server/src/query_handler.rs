//! Query handler for the app-server.
//!
//! Owns the query engine, drives the one-time index build, and answers
//! queries and health checks on behalf of the HTTP routes.

use std::sync::Arc;

use saathi_retrieval::{BuildReport, EngineStats, QueryEngine, QueryResponse, Result};
use tracing::{error, info, warn};

/// Handler for query operations.
#[derive(Clone)]
pub struct QueryHandler {
    engine: Arc<QueryEngine>,
}

impl QueryHandler {
    /// Create a new query handler around an unbuilt engine.
    pub fn new(engine: QueryEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Build the index over the configured corpus.
    pub async fn index_corpus(&self) -> Result<BuildReport> {
        info!("=== CORPUS INDEXING START ===");

        let report = match self.engine.build_index().await {
            Ok(report) => report,
            Err(e) => {
                error!("Failed to build semantic index: {e}");
                return Err(e);
            }
        };

        info!("=== CORPUS INDEXING COMPLETE ===");
        info!("Documents indexed: {}", report.documents);
        info!("Dimension: {}", report.dimension);
        if !report.fallback_ids.is_empty() {
            warn!("Documents using fallback vectors: {:?}", report.fallback_ids);
        }

        Ok(report)
    }

    /// Build the index on a background task.
    pub fn spawn_indexing(&self) -> tokio::task::JoinHandle<Result<BuildReport>> {
        let handler = self.clone();
        tokio::spawn(async move { handler.index_corpus().await })
    }

    /// Answer a user query.
    pub async fn query(&self, text: &str) -> Result<QueryResponse> {
        self.engine.handle_query(text).await
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }
}
