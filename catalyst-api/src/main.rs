//! Catalyst Recommendation API Server
//!
//! Serves proposal recommendations from a SQLite embedding store.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use catalyst_api::{app, AppState};
use catalyst_embedding::EmbeddingStore;
use catalyst_recommend::{RecommendationService, RecommenderConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,catalyst_api=debug")),
        )
        .init();

    info!("Starting Catalyst Recommendation API");

    let config = RecommenderConfig::from_env().context("Invalid recommender configuration")?;
    info!(
        "Recommender config: field '{}', kind {}, blend weight {}",
        config.default_field, config.entity_kind, config.blend_weight
    );

    let db_path =
        std::env::var("EMBEDDINGS_DB_PATH").unwrap_or_else(|_| "data/embeddings.db".to_string());
    if let Some(parent) = Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    info!("Opening embedding store at: {}", db_path);
    let store = EmbeddingStore::new(&db_path).context("Failed to open embedding store")?;

    let stats = store.stats()?;
    info!(
        "Embedding store ready: {} record(s) across {} field(s)",
        stats.total,
        stats.by_field.len()
    );

    let state = AppState::new(RecommendationService::new(Arc::new(store), config));

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3001".to_string())
        .parse()
        .context("Invalid BIND_ADDR")?;
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
