//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use catalyst_embedding::StoreStats;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    embeddings: Option<StoreStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check handler; degraded when the embedding store is unreadable
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let stats = tokio::task::spawn_blocking(move || state.service.store().stats()).await;

    match stats {
        Ok(Ok(stats)) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                embeddings: Some(stats),
                error: None,
            }),
        ),
        Ok(Err(e)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                embeddings: None,
                error: Some(e.to_string()),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                embeddings: None,
                error: Some(e.to_string()),
            }),
        ),
    }
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}
