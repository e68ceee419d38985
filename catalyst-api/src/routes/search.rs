//! Search re-ranking endpoint

use axum::{extract::State, routing::post, Json, Router};
use catalyst_core::{FeedbackSet, RankedResult};
use serde::{Deserialize, Serialize};

use super::{blocking, validate_field};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EnhanceBody {
    /// Results in their original search order
    pub results: Vec<RankedResult>,
    #[serde(default)]
    pub liked_ids: Vec<String>,
    #[serde(default)]
    pub disliked_ids: Vec<String>,
    pub field: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EnhanceResponse {
    pub results: Vec<RankedResult>,
    pub count: usize,
}

/// Blend the session profile into a search ranking
async fn enhance(
    State(state): State<AppState>,
    Json(body): Json<EnhanceBody>,
) -> ApiResult<Json<EnhanceResponse>> {
    validate_field(body.field.as_deref())?;
    let feedback = FeedbackSet::new(body.liked_ids, body.disliked_ids)?;
    let results = body.results;
    let field = body.field;

    let results = blocking(&state, move |state| {
        Ok(state
            .service
            .enhance_search_results(results, &feedback, field.as_deref())?)
    })
    .await?;

    Ok(Json(EnhanceResponse {
        count: results.len(),
        results,
    }))
}

/// Create search routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/search/enhance", post(enhance))
}
