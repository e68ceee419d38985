//! Proposal recommendation and re-ranking from swipe feedback
//!
//! A swipe session (liked and disliked proposals) is reduced to a preference
//! centroid and an avoidance centroid. Candidates are scored by how much
//! closer they sit to the first than to the second, either to produce a
//! recommendation list or to nudge an existing search ranking.

pub mod config;
pub mod error;
pub mod profile;
pub mod scorer;
pub mod service;

pub use config::{ConfigError, RecommenderConfig};
pub use error::{RecommendError, Result};
pub use profile::{CoverageGap, PreferenceModeler, PreferenceProfile, SampleSize};
pub use scorer::{confidence, CandidateScore, RecommendationEntry, Recommendations, Scorer};
pub use service::{RecommendationRequest, RecommendationService};
