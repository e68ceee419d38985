//! Preference profiles built from swipe feedback

use std::collections::BTreeSet;

use catalyst_core::{EntityKind, FeedbackSet};
use catalyst_embedding::{centroid, EmbeddingVector, VectorStore};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::Result;

/// Number of vectors that contributed to each centroid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SampleSize {
    pub liked: usize,
    pub disliked: usize,
}

/// Feedback ids that had no embedding for the requested field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageGap {
    pub liked: Vec<String>,
    pub disliked: Vec<String>,
}

impl CoverageGap {
    pub fn is_empty(&self) -> bool {
        self.liked.is_empty() && self.disliked.is_empty()
    }

    pub fn len(&self) -> usize {
        self.liked.len() + self.disliked.len()
    }
}

/// A user's implicit taste model for one session
///
/// An absent vector means "no signal" on that side. It is never replaced by a
/// zero vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceProfile {
    /// Field the centroids live in
    pub field: String,
    /// Centroid of liked embeddings
    pub preference_vector: Option<EmbeddingVector>,
    /// Centroid of disliked embeddings
    pub avoidance_vector: Option<EmbeddingVector>,
    pub sample_size: SampleSize,
    pub missing: CoverageGap,
}

impl PreferenceProfile {
    /// Profile with no signal on either side
    pub fn empty(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            preference_vector: None,
            avoidance_vector: None,
            sample_size: SampleSize::default(),
            missing: CoverageGap::default(),
        }
    }

    pub fn has_signal(&self) -> bool {
        self.preference_vector.is_some() || self.avoidance_vector.is_some()
    }
}

/// Reduces feedback sets to preference profiles
pub struct PreferenceModeler<'a, S: VectorStore + ?Sized> {
    store: &'a S,
    kind: EntityKind,
}

impl<'a, S: VectorStore + ?Sized> PreferenceModeler<'a, S> {
    /// Create a modeler resolving feedback ids as entities of `kind`
    pub fn new(store: &'a S, kind: EntityKind) -> Self {
        Self { store, kind }
    }

    /// Build the preference and avoidance centroids for a feedback set
    ///
    /// Ids without an embedding in `field` are dropped and reported in
    /// `missing`; they never fail the build.
    #[instrument(skip(self, feedback), fields(liked = feedback.liked_ids().len(), disliked = feedback.disliked_ids().len()))]
    pub fn build_profile(&self, feedback: &FeedbackSet, field: &str) -> Result<PreferenceProfile> {
        let (liked_vectors, liked_missing) = self.fetch_side(feedback.liked_ids(), field);
        let (disliked_vectors, disliked_missing) = self.fetch_side(feedback.disliked_ids(), field);

        let preference_vector = centroid(&as_slices(&liked_vectors))?;
        let avoidance_vector = centroid(&as_slices(&disliked_vectors))?;

        let missing = CoverageGap {
            liked: liked_missing,
            disliked: disliked_missing,
        };
        if !missing.is_empty() {
            debug!(
                "Coverage gap in field '{}': {} liked and {} disliked ids without embeddings",
                field,
                missing.liked.len(),
                missing.disliked.len()
            );
        }

        Ok(PreferenceProfile {
            field: field.to_string(),
            preference_vector,
            avoidance_vector,
            sample_size: SampleSize {
                liked: liked_vectors.len(),
                disliked: disliked_vectors.len(),
            },
            missing,
        })
    }

    fn fetch_side(
        &self,
        ids: &BTreeSet<String>,
        field: &str,
    ) -> (Vec<EmbeddingVector>, Vec<String>) {
        let mut vectors = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();

        for id in ids {
            match self.store.get(self.kind, id, field) {
                Ok(Some(record)) => vectors.push(record.vector),
                Ok(None) => missing.push(id.clone()),
                Err(e) => {
                    warn!("Failed to fetch embedding for {}:{}: {}", self.kind, id, e);
                    missing.push(id.clone());
                }
            }
        }

        (vectors, missing)
    }
}

fn as_slices(vectors: &[EmbeddingVector]) -> Vec<&[f32]> {
    vectors.iter().map(Vec::as_slice).collect()
}
