//! Search results supplied by the listing/search layer

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A search result carrying an externally computed rank
///
/// `ranking_total` is opaque to the recommender. `ai_score` and `final_score`
/// are filled in when results are re-ranked; every other attribute of the
/// result is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub id: String,
    #[serde(default)]
    pub ranking_total: f64,
    #[serde(default)]
    pub ai_score: f64,
    #[serde(default)]
    pub final_score: f64,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl RankedResult {
    pub fn new(id: impl Into<String>, ranking_total: f64) -> Self {
        Self {
            id: id.into(),
            ranking_total,
            ai_score: 0.0,
            final_score: ranking_total,
            attributes: Map::new(),
        }
    }

    /// Attach a passthrough attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
