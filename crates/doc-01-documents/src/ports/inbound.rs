//! # Inbound Ports (Driving Ports / API)
//!
//! Traits that define the public API of the document service.

use async_trait::async_trait;
use shared_types::{Document, DocumentResult, OperationContext, VerificationOutcome};

/// Document lifecycle API.
///
/// Every operation is bounded by the given [`OperationContext`]: deadline
/// expiry surfaces as `Internal`, cancellation as `Cancelled`.
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait DocumentApi: Send + Sync {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Store a new document and announce it.
    ///
    /// A fresh `uuid` is assigned; any value in `candidate` is ignored.
    ///
    /// # Errors
    /// * `Validation` - candidate is malformed, nothing stored
    /// * `Conflict` - `documentId` already exists, nothing stored
    /// * `Internal` - store failure, or the event could not be published (the
    ///   record stays stored)
    async fn create(&self, ctx: &OperationContext, candidate: Document)
        -> DocumentResult<Document>;

    /// All documents in insertion order.
    async fn list(&self, ctx: &OperationContext) -> DocumentResult<Vec<Document>>;

    /// The document stored under `document_id`.
    async fn get(&self, ctx: &OperationContext, document_id: &str) -> DocumentResult<Document>;

    /// Replace the document stored under `document_id`.
    ///
    /// The stored `uuid` is carried forward and any recorded validation is
    /// cleared.
    async fn update(
        &self,
        ctx: &OperationContext,
        document_id: &str,
        candidate: Document,
    ) -> DocumentResult<Document>;

    /// Remove the document stored under `document_id`.
    async fn delete(&self, ctx: &OperationContext, document_id: &str) -> DocumentResult<()>;

    // =========================================================================
    // Verification
    // =========================================================================

    /// Check `signature` against `candidate` with the remote verifier.
    ///
    /// An invalid signature is a successful outcome with `valid = false`.
    async fn verify(
        &self,
        ctx: &OperationContext,
        candidate: Document,
        signature: &str,
    ) -> DocumentResult<VerificationOutcome>;
}
