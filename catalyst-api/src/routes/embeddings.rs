//! Embedding similarity and statistics endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use catalyst_core::EntityKind;
use catalyst_embedding::{EmbeddingMetadata, MetadataFilter, SimilarityMatch, StoreStats};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{blocking, validate_field, validate_limit, validate_threshold};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Body for `POST /api/embeddings/similar`
#[derive(Debug, Deserialize)]
pub struct SimilarBody {
    pub vector: Vec<f32>,
    pub field: Option<String>,
    pub limit: Option<usize>,
    pub threshold: Option<f64>,
    pub filter: Option<MetadataFilter>,
}

/// Query parameters for entity neighbours
#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub field: Option<String>,
    pub limit: Option<usize>,
    pub threshold: Option<f64>,
}

/// A match without its raw vector
#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub kind: EntityKind,
    pub id: String,
    pub field: String,
    pub similarity: f64,
    pub metadata: EmbeddingMetadata,
}

impl From<SimilarityMatch> for MatchResponse {
    fn from(m: SimilarityMatch) -> Self {
        Self {
            kind: m.record.entity.kind,
            id: m.record.entity.id,
            field: m.record.field,
            similarity: m.similarity,
            metadata: m.record.metadata,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchResponse>,
    pub count: usize,
}

impl From<Vec<SimilarityMatch>> for MatchesResponse {
    fn from(matches: Vec<SimilarityMatch>) -> Self {
        let matches: Vec<MatchResponse> = matches.into_iter().map(Into::into).collect();
        Self {
            count: matches.len(),
            matches,
        }
    }
}

/// Nearest neighbours of a caller-supplied vector
async fn similar_to_vector(
    State(state): State<AppState>,
    Json(body): Json<SimilarBody>,
) -> ApiResult<Json<MatchesResponse>> {
    if body.vector.is_empty() {
        return Err(ApiError::bad_request("vector must not be empty"));
    }
    if body.vector.iter().any(|v| !v.is_finite()) {
        return Err(ApiError::bad_request("vector must contain only finite values"));
    }
    validate_field(body.field.as_deref())?;
    validate_limit(body.limit)?;
    validate_threshold(body.threshold)?;

    let matches = blocking(&state, move |state| {
        Ok(state.service.similar_to(
            &body.vector,
            body.field.as_deref(),
            body.limit,
            body.threshold,
            body.filter.as_ref(),
        )?)
    })
    .await?;

    Ok(Json(matches.into()))
}

/// Neighbours of an existing entity, excluding itself
async fn similar_to_entity(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<SimilarQuery>,
) -> ApiResult<Json<MatchesResponse>> {
    let kind: EntityKind = kind.parse()?;
    validate_field(query.field.as_deref())?;
    validate_limit(query.limit)?;
    validate_threshold(query.threshold)?;
    debug!("Similar-entity query for {}:{}", kind, id);

    let matches = blocking(&state, move |state| {
        Ok(state.service.similar_to_entity(
            kind,
            &id,
            query.field.as_deref(),
            query.limit,
            query.threshold,
            None,
        )?)
    })
    .await?;

    Ok(Json(matches.into()))
}

/// Stored embedding counts per field
async fn stats(State(state): State<AppState>) -> ApiResult<Json<StoreStats>> {
    let stats = blocking(&state, |state| Ok(state.service.store().stats()?)).await?;
    Ok(Json(stats))
}

/// Create embedding routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/embeddings/similar", post(similar_to_vector))
        .route("/embeddings/stats", get(stats))
        .route("/embeddings/{kind}/{id}/similar", get(similar_to_entity))
}
