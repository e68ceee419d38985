//! Core types for embeddings

use std::collections::BTreeMap;

use catalyst_core::EntityRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Embedding vector (dimension is fixed per field)
pub type EmbeddingVector = Vec<f32>;

/// Denormalized proposal attributes used for pre-filtering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMetadata {
    /// Year the proposal was funded, or created if never funded
    pub funding_year: Option<i32>,
    /// Fund label, e.g. "Fund 12"
    pub fund_label: Option<String>,
    /// Campaign (challenge) title
    pub campaign_title: Option<String>,
    #[serde(default)]
    pub is_funded: bool,
    pub amount_requested: Option<f64>,
    /// Currency of `amount_requested` (ADA, USD)
    pub currency: Option<String>,
}

/// A stored embedding for one field of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Owning entity
    pub entity: EntityRef,
    /// Logical field the vector represents ("title", "combined", ...)
    pub field: String,
    /// The embedding vector
    pub vector: EmbeddingVector,
    /// Filter metadata
    #[serde(default)]
    pub metadata: EmbeddingMetadata,
    /// Model that produced the vector
    pub model: Option<String>,
    /// SHA256 hex of the source text
    pub content_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmbeddingRecord {
    /// Create a new embedding record
    pub fn new(entity: EntityRef, field: impl Into<String>, vector: EmbeddingVector) -> Self {
        let now = Utc::now();
        Self {
            entity,
            field: field.into(),
            vector,
            metadata: EmbeddingMetadata::default(),
            model: None,
            content_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_metadata(mut self, metadata: EmbeddingMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Record which model embedded which source text
    pub fn with_source(mut self, model: impl Into<String>, source_text: &str) -> Self {
        self.model = Some(model.into());
        self.content_hash = Some(content_hash(source_text));
        self
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// Nearest-neighbour match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub record: EmbeddingRecord,
    /// Cosine similarity (-1.0 - 1.0)
    pub similarity: f64,
}

/// Statistics about stored embeddings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    /// Record count per field
    pub by_field: BTreeMap<String, usize>,
}

/// SHA256 of source text, hex encoded
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
