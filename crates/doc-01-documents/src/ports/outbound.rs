//! # Outbound Ports (Driven Ports / SPI)
//!
//! Traits that define dependencies the document service needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{
    Document, DocumentCreatedEvent, OperationContext, Validation, VerificationReply,
    VerificationRequest,
};
use thiserror::Error;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Error from document storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// No document under the key.
    #[error("document {0} not found")]
    NotFound(String),

    /// The key is already taken.
    #[error("document {0} already exists")]
    Duplicate(String),

    /// The backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Key-unique document store keyed by `documentId`.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Store a new document.
    ///
    /// # Errors
    /// * `Duplicate` - a document with the same `documentId` exists
    async fn insert(&self, document: Document) -> Result<Document, RepositoryError>;

    /// All documents in insertion order.
    async fn find_all(&self) -> Result<Vec<Document>, RepositoryError>;

    async fn find_by_id(&self, document_id: &str) -> Result<Option<Document>, RepositoryError>;

    /// Replace the document stored under `document_id` with `document`,
    /// which may carry a different `documentId`.
    ///
    /// # Errors
    /// * `NotFound` - nothing stored under `document_id`
    /// * `Duplicate` - the new `documentId` belongs to another document
    async fn replace(
        &self,
        document_id: &str,
        document: Document,
    ) -> Result<Document, RepositoryError>;

    /// Attach `validation` to the stored document.
    async fn record_validation(
        &self,
        document_id: &str,
        validation: Validation,
    ) -> Result<(), RepositoryError>;

    /// Delete the document stored under `document_id`.
    ///
    /// # Errors
    /// * `NotFound` - nothing matched
    async fn remove(&self, document_id: &str) -> Result<(), RepositoryError>;
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Error from publishing a document event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("event publish failed: {0}")]
pub struct EventError(pub String);

/// Outbound notifications about stored documents.
#[async_trait]
pub trait DocumentEventPublisher: Send + Sync {
    async fn document_created(&self, event: DocumentCreatedEvent) -> Result<(), EventError>;
}

// =============================================================================
// REMOTE VERIFICATION
// =============================================================================

/// Error from the remote verifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifierError {
    #[error("verifier did not reply in time")]
    Timeout,

    #[error("verification cancelled")]
    Cancelled,

    #[error("verifier unreachable: {0}")]
    Unavailable(String),

    #[error("malformed verification exchange: {0}")]
    Malformed(String),
}

/// Remote signature verification.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn verify(
        &self,
        ctx: &OperationContext,
        request: &VerificationRequest,
    ) -> Result<VerificationReply, VerifierError>;
}

// =============================================================================
// TIME
// =============================================================================

/// Source of the current time, injected for deterministic tests.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
