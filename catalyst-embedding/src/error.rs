//! Error types for embedding operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Vector length disagrees with the field's dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding vector has a non-finite value at index {index}")]
    NonFiniteVector { index: usize },
}

impl From<rusqlite::Error> for EmbeddingError {
    fn from(e: rusqlite::Error) -> Self {
        EmbeddingError::Database(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for EmbeddingError {
    fn from(e: bincode::error::EncodeError) -> Self {
        EmbeddingError::Serialization(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for EmbeddingError {
    fn from(e: bincode::error::DecodeError) -> Self {
        EmbeddingError::Serialization(e.to_string())
    }
}
