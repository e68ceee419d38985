//! Error types for core domain validation

use thiserror::Error;

/// Validation errors raised while constructing core types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    #[error("Feedback sets overlap on {} id(s): {}", .0.len(), .0.join(", "))]
    OverlappingFeedback(Vec<String>),
}

impl CoreError {
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        CoreError::UnknownEntityKind(kind.into())
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
