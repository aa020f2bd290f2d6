//! Error types for the vector index engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Coarse classification of an [`EngineError`], used by the request layer
/// to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    DimensionMismatch,
    Embedding,
    Internal,
}

/// Error types that can occur in engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("Index already exists: {name}")]
    AlreadyExists { name: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Snapshot corrupted: {0}")]
    Corrupted(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        EngineError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn index_not_found(name: impl Into<String>) -> Self {
        EngineError::NotFound {
            what: "Index",
            name: name.into(),
        }
    }

    pub fn record_not_found(id: impl Into<String>) -> Self {
        EngineError::NotFound {
            what: "Record",
            name: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            EngineError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            EngineError::Embedding(_) => ErrorKind::Embedding,
            EngineError::IoError(_)
            | EngineError::SerializationError(_)
            | EngineError::Corrupted(_)
            | EngineError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for EngineError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        EngineError::Internal("lock poisoned".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = EngineError::index_not_found("docs");
        assert_eq!(e.to_string(), "Index not found: docs");
        assert_eq!(e.kind(), ErrorKind::NotFound);

        let e = EngineError::DimensionMismatch {
            expected: 384,
            actual: 3,
        };
        assert_eq!(e.to_string(), "Dimension mismatch: expected 384, got 3");
    }

    #[test]
    fn test_io_is_internal() {
        let e: EngineError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert_eq!(e.kind(), ErrorKind::Internal);
    }
}
