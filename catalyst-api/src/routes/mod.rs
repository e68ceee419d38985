//! API route definitions

mod embeddings;
mod health;
mod recommendations;
mod search;

use axum::Router;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Create all `/api` routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(recommendations::routes())
        .merge(search::routes())
        .merge(embeddings::routes())
}

/// Create health routes (served outside `/api`)
pub fn health_routes() -> Router<AppState> {
    health::routes()
}

/// Run a store-bound call off the async runtime
async fn blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> ApiResult<T> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(ApiError::from)?
}

fn validate_limit(limit: Option<usize>) -> ApiResult<()> {
    match limit {
        Some(0) => Err(ApiError::bad_request("limit must be at least 1")),
        _ => Ok(()),
    }
}

fn validate_threshold(threshold: Option<f64>) -> ApiResult<()> {
    match threshold {
        Some(t) if !(-1.0..=1.0).contains(&t) => Err(ApiError::bad_request(format!(
            "threshold must be within [-1, 1], got {}",
            t
        ))),
        _ => Ok(()),
    }
}

fn validate_field(field: Option<&str>) -> ApiResult<()> {
    match field {
        Some(f) if f.trim().is_empty() => Err(ApiError::bad_request("field must not be empty")),
        _ => Ok(()),
    }
}
