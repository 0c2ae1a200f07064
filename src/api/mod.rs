//! HTTP surface: router assembly, health check and CORS policy.

pub mod answer;

use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the application router. Browser preflight (OPTIONS) requests
/// are answered by the CORS layer before any handler runs.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origins.as_deref());

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/answer", post(answer::answer))
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn cors_layer(origins: Option<&str>) -> CorsLayer {
    if let Some(origins_str) = origins {
        // Parse the comma-separated origin list and build a restrictive layer.
        let origins: Vec<axum::http::HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        if origins.is_empty() {
            wildcard_cors()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_headers(Any)
                .allow_methods(Any)
        }
    } else {
        // Wildcard is fine for development; set DOC_ANSWER_CORS_ORIGINS in production.
        wildcard_cors()
    }
}

fn wildcard_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any)
}
