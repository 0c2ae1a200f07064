//! Request-level error taxonomy.
//!
//! Every pipeline stage maps its failures into one [`PipelineError`]
//! variant, so handlers can bail with `?` and still produce the right
//! status code and JSON body. Auth failures use the fixed
//! `{"message": "Jwt Auth error"}` body that clients key on; everything
//! else that aborts a request before streaming gets `{"error": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::query::EmptyQueryError;

/// All the ways an answer request can abort before streaming starts.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required configuration value is missing or unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request body failed validation.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The transcript yields nothing to search for.
    #[error(transparent)]
    EmptyQuery(#[from] EmptyQueryError),

    /// The identity service rejected the session token.
    #[error("auth failed: {0}")]
    Auth(#[source] anyhow::Error),

    /// Query embedding or hybrid search failed.
    #[error("retrieval failed: {0}")]
    Retrieval(#[source] anyhow::Error),

    /// The completion request failed before any chunk arrived.
    #[error("completion failed: {0}")]
    Completion(#[source] anyhow::Error),

    /// The citation write failed. Only logged in the normal flow: the
    /// answer is already on the wire when persistence runs.
    #[error("persistence failed: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl PipelineError {
    fn status(&self) -> StatusCode {
        match self {
            PipelineError::Auth(_) => StatusCode::UNAUTHORIZED,
            PipelineError::Config(_) | PipelineError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let body = match &self {
            // Client faults: echo the message, nothing worth logging.
            PipelineError::Validation(_) | PipelineError::EmptyQuery(_) => {
                json!({ "error": self.to_string() })
            }

            // Fixed body; web clients match on it to force a re-login.
            PipelineError::Auth(e) => {
                error!(error = %e, "session verification failed");
                json!({ "message": "Jwt Auth error" })
            }

            // Stage failures: log the detail, return the stage message.
            PipelineError::Config(_)
            | PipelineError::Retrieval(_)
            | PipelineError::Completion(_)
            | PipelineError::Persistence(_) => {
                error!(error = %self, "pipeline stage failed");
                json!({ "error": self.to_string() })
            }
        };
        (self.status(), Json(body)).into_response()
    }
}
