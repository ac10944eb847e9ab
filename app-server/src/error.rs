//! Mapping of engine failures onto HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saathi_retrieval::RetrievalError;
use serde_json::json;
use thiserror::Error;

/// Errors returned by the HTTP routes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmptyQuery => StatusCode::BAD_REQUEST,
            Self::InvalidBody(rejection) => rejection.status(),
            Self::Retrieval(RetrievalError::IndexNotReady) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Retrieval(e) if e.is_embedding_unavailable() => StatusCode::BAD_GATEWAY,
            Self::Retrieval(RetrievalError::Generation(_)) => StatusCode::BAD_GATEWAY,
            Self::Retrieval(RetrievalError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Retrieval(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "validation",
            Self::InvalidBody(_) => "invalid_body",
            Self::Retrieval(RetrievalError::IndexNotReady) => "index_not_ready",
            Self::Retrieval(e) if e.is_embedding_unavailable() => "embedding_unavailable",
            Self::Retrieval(RetrievalError::Generation(_)) => "generation",
            Self::Retrieval(RetrievalError::Timeout(_)) => "timeout",
            Self::Retrieval(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Query failed: {self}");
        }
        let payload = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, Json(payload)).into_response()
    }
}
