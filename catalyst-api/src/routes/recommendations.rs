//! Swipe-session recommendation endpoint

use axum::{extract::State, routing::post, Json, Router};
use catalyst_core::FeedbackSet;
use catalyst_embedding::MetadataFilter;
use catalyst_recommend::{RecommendationRequest, Recommendations};
use serde::Deserialize;
use tracing::info;

use super::{blocking, validate_field, validate_limit};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Body for `POST /api/recommendations`
#[derive(Debug, Deserialize)]
pub struct RecommendationBody {
    #[serde(default)]
    pub liked_ids: Vec<String>,
    #[serde(default)]
    pub disliked_ids: Vec<String>,
    pub field: Option<String>,
    #[serde(default)]
    pub exclude_ids: Vec<String>,
    /// Restrict ranking to these ids instead of the whole field
    pub candidate_ids: Option<Vec<String>>,
    pub filter: Option<MetadataFilter>,
    pub limit: Option<usize>,
}

impl RecommendationBody {
    fn into_request(self) -> ApiResult<RecommendationRequest> {
        validate_limit(self.limit)?;
        validate_field(self.field.as_deref())?;
        if self
            .liked_ids
            .iter()
            .chain(&self.disliked_ids)
            .any(|id| id.trim().is_empty())
        {
            return Err(ApiError::bad_request("feedback ids must not be empty"));
        }

        let feedback = FeedbackSet::new(self.liked_ids, self.disliked_ids)?;
        Ok(RecommendationRequest {
            feedback,
            field: self.field,
            exclude_ids: self.exclude_ids.into_iter().collect(),
            candidate_ids: self.candidate_ids,
            filter: self.filter,
            limit: self.limit,
        })
    }
}

/// Recommend proposals for a swipe session
async fn recommend(
    State(state): State<AppState>,
    Json(body): Json<RecommendationBody>,
) -> ApiResult<Json<Recommendations>> {
    let request = body.into_request()?;
    info!(
        "Recommendation request: {} liked, {} disliked",
        request.feedback.liked_ids().len(),
        request.feedback.disliked_ids().len()
    );

    let recommendations =
        blocking(&state, move |state| Ok(state.service.recommend(&request)?)).await?;
    Ok(Json(recommendations))
}

/// Create recommendation routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/recommendations", post(recommend))
}
