//! HTTP transport for the DigiSaathi query engine.
//!
//! Routes:
//! - `POST /query` with `{"query": "..."}` answers a question.
//! - `GET /health` reports whether the index is ready.
//!
//! The index is built on a background task once the listener is bound;
//! queries arriving earlier get a 503.

pub mod error;
pub mod query_handler;

use std::net::SocketAddr;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::{get, post};
use saathi_retrieval::{IndexState, QueryEngine, RetrievalConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

pub use error::ApiError;
pub use query_handler::QueryHandler;

/// Body of `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Reply to `POST /query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReply {
    /// Text to show the user.
    pub response: String,

    /// Retrieved documents, closest first.
    pub matches: Vec<String>,
}

/// Reply to `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReply {
    pub status: String,
    pub ready: bool,
    pub documents: usize,
    pub fallback_documents: usize,
    pub degraded: bool,
}

/// Answer a query.
pub async fn query(
    State(handler): State<QueryHandler>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryReply>, ApiError> {
    let Json(request) = payload?;
    if request.query.trim().is_empty() {
        return Err(ApiError::EmptyQuery);
    }

    let response = handler.query(&request.query).await?;
    Ok(Json(QueryReply {
        response: response.display_text(),
        matches: response.matches().to_vec(),
    }))
}

/// Report readiness.
pub async fn health(State(handler): State<QueryHandler>) -> (StatusCode, Json<HealthReply>) {
    let stats = handler.stats();
    let (status, label) = match stats.state {
        IndexState::Ready => (StatusCode::OK, "ok"),
        IndexState::Building => (StatusCode::SERVICE_UNAVAILABLE, "building"),
        IndexState::Uninitialized => (StatusCode::SERVICE_UNAVAILABLE, "uninitialized"),
    };

    (
        status,
        Json(HealthReply {
            status: label.to_string(),
            ready: handler.is_ready(),
            documents: stats.documents,
            fallback_documents: stats.fallback_documents,
            degraded: stats.degraded,
        }),
    )
}

/// Routes served by the app-server.
pub fn router(handler: QueryHandler) -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/health", get(health))
        .with_state(handler)
}

/// Bind `addr`, start indexing, and serve until ctrl-c.
pub async fn run(config: RetrievalConfig, addr: SocketAddr) -> anyhow::Result<()> {
    let handler = QueryHandler::new(QueryEngine::from_config(&config)?);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    let _indexing = handler.spawn_indexing();

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;
    use axum::response::IntoResponse;
    use pretty_assertions::assert_eq;
    use retrieval_test_support::CharProvider;
    use saathi_retrieval::{EmbeddingClient, Generator};
    use std::sync::{Arc, Mutex};

    fn handler() -> QueryHandler {
        let client = EmbeddingClient::new(Arc::new(CharProvider::new()));
        QueryHandler::new(
            QueryEngine::builder(client)
                .with_corpus(["a cat sat", "a dog ran", "the sky is blue"])
                .with_top_k(1)
                .build(),
        )
    }

    fn request(text: &str) -> Result<Json<QueryRequest>, JsonRejection> {
        Ok(Json(QueryRequest {
            query: text.to_string(),
        }))
    }

    /// Records every prompt and answers with a fixed string.
    #[derive(Default)]
    struct EchoGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> saathi_retrieval::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("answered".to_string())
        }
    }

    #[tokio::test]
    async fn test_health_before_and_after_indexing() {
        let handler = handler();

        let (status, Json(reply)) = health(State(handler.clone())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!reply.ready);

        handler.spawn_indexing().await.unwrap().unwrap();

        let (status, Json(reply)) = health(State(handler)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            reply,
            HealthReply {
                status: "ok".to_string(),
                ready: true,
                documents: 3,
                fallback_documents: 0,
                degraded: false,
            }
        );
    }

    #[tokio::test]
    async fn test_query_before_ready_is_unavailable() {
        let err = query(State(handler()), request("a cat sat"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let handler = handler();
        handler.index_corpus().await.unwrap();

        let err = query(State(handler), request("   ")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_returns_matches() {
        let handler = handler();
        handler.index_corpus().await.unwrap();

        let Json(reply) = query(State(handler), request("a cat sat")).await.unwrap();
        assert_eq!(
            reply,
            QueryReply {
                response: "a cat sat".to_string(),
                matches: vec!["a cat sat".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_query_text_reaches_engine_untrimmed() {
        let generator = Arc::new(EchoGenerator::default());
        let client = EmbeddingClient::new(Arc::new(CharProvider::new()));
        let handler = QueryHandler::new(
            QueryEngine::builder(client)
                .with_corpus(["a cat sat"])
                .with_top_k(1)
                .with_generator(generator.clone())
                .with_system_prompt("Sys")
                .build(),
        );
        handler.index_corpus().await.unwrap();

        let Json(reply) = query(State(handler), request("  a cat sat ")).await.unwrap();
        assert_eq!(reply.response, "answered");
        assert_eq!(
            *generator.prompts.lock().unwrap(),
            vec!["Sys\nContext:\na cat sat\nQuestion:   a cat sat \nAnswer:".to_string()]
        );
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_error() {
        let handler = handler();
        handler.index_corpus().await.unwrap();

        let raw = Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from("{\"query\": "))
            .unwrap();
        let payload = Json::<QueryRequest>::from_request(raw, &()).await;

        let err = query(State(handler), payload).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "invalid_body");
    }
}
