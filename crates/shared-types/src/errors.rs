//! # Error Types
//!
//! The error taxonomy every document operation reports.
//!
//! | Kind | Meaning | Transport status |
//! |------|---------|------------------|
//! | Validation | malformed input, client-fixable | 400 |
//! | NotFound | referenced key absent | 404 |
//! | Conflict | key already exists | 409 |
//! | Internal | broker/store/serialization failure, timeout | 500 |
//! | Cancelled | caller abandoned the operation | 503 |

use thiserror::Error;

/// Coarse classification of a [`DocumentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
    Cancelled,
}

impl ErrorKind {
    /// Fixed mapping from error kind to HTTP status code.
    pub const fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
            ErrorKind::Cancelled => 503,
        }
    }
}

/// Errors returned by the document orchestration layer.
///
/// Messages are stable and never carry the text of an underlying broker or
/// store error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// The candidate document is structurally invalid.
    #[error("{0}")]
    Validation(String),

    /// No document exists under the referenced key.
    #[error("{0}")]
    NotFound(String),

    /// A document already exists under the key.
    #[error("{0}")]
    Conflict(String),

    /// Transport, storage or serialization failure.
    #[error("{0}")]
    Internal(String),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl DocumentError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(document_id: &str) -> Self {
        Self::NotFound(format!("document with documentId {document_id} not found"))
    }

    pub fn conflict(document_id: &str) -> Self {
        Self::Conflict(format!("document with documentId {document_id} already exists"))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::Validation(_) => ErrorKind::Validation,
            DocumentError::NotFound(_) => ErrorKind::NotFound,
            DocumentError::Conflict(_) => ErrorKind::Conflict,
            DocumentError::Internal(_) => ErrorKind::Internal,
            DocumentError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

/// Result alias for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;
