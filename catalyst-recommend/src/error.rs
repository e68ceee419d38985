//! Error types for recommendation operations

use catalyst_core::CoreError;
use catalyst_embedding::EmbeddingError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecommendError>;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
