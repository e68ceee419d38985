//! Embedding Storage and Similarity Search for Catalyst content
//!
//! This crate holds the precomputed embedding vectors of proposals and other
//! content and answers nearest-neighbour queries over them.
//!
//! ## Features
//! - Store one vector per (entity, field) pair with denormalized filter metadata
//! - Calculate cosine similarity and centroids of embeddings
//! - Pre-filter candidates with typed metadata predicates
//! - SQLite-backed and in-memory stores behind the [`VectorStore`] trait

pub mod error;
pub mod filter;
pub mod memory;
pub mod similarity;
pub mod store;
pub mod types;

pub use error::{EmbeddingError, Result};
pub use filter::{CmpOp, MetadataFilter, Predicate};
pub use memory::InMemoryEmbeddingStore;
pub use similarity::{centroid, cosine_similarity, ensure_finite, rank_matches};
pub use store::{EmbeddingStore, VectorStore};
pub use types::{
    content_hash, EmbeddingMetadata, EmbeddingRecord, EmbeddingVector, SimilarityMatch, StoreStats,
};
