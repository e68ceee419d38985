//! Catalyst Recommendation API
//!
//! HTTP surface over the recommendation service: swipe-session
//! recommendations, search re-ranking and raw similarity queries.

pub mod error;
mod routes;

use std::sync::Arc;

use axum::{
    http::{header, Method},
    Router,
};
use catalyst_embedding::EmbeddingStore;
use catalyst_recommend::RecommendationService;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecommendationService<EmbeddingStore>>,
}

impl AppState {
    pub fn new(service: RecommendationService<EmbeddingStore>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Build the full router with CORS and request tracing
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(routes::health_routes())
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
