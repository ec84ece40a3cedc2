//! # Broker Message Payloads
//!
//! Payloads published to, or consumed from, the message broker.
//!
//! ## Design Rules
//!
//! - Payloads are JSON with `content_type = application/json`.
//! - Request/reply pairs are matched by the broker-level `correlation_id`
//!   property, never by a payload field.
//! - Deserializers accept the field names the deployed verifier emits
//!   (`documento`/`firma`, `valido`/`mensaje`) as aliases.

use crate::entities::{Document, VerificationOutcome};
use serde::{Deserialize, Serialize};

// =============================================================================
// DOCUMENT EVENTS
// =============================================================================

/// Notification that a document was stored.
/// Exchange: `documents` | Routing key: `documents.created`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCreatedEvent {
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub uuid: String,
}

impl DocumentCreatedEvent {
    pub fn from_document(document: &Document) -> Self {
        Self {
            document_id: document.document_id.clone(),
            uuid: document.uuid.clone(),
        }
    }
}

// =============================================================================
// SIGNATURE VERIFICATION (request/reply)
// =============================================================================

/// Request sent to the remote verifier.
/// Queue: `verify.request` | Reply: caller's private reply queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// The document as submitted by the caller.
    #[serde(alias = "documento")]
    pub document: Document,
    /// Signature to check against the document.
    #[serde(alias = "firma")]
    pub signature: String,
}

/// Reply produced by the remote verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReply {
    #[serde(alias = "valido")]
    pub valid: bool,
    #[serde(alias = "mensaje", default)]
    pub message: String,
}

impl From<VerificationReply> for VerificationOutcome {
    fn from(reply: VerificationReply) -> Self {
        Self {
            valid: reply.valid,
            message: reply.message,
        }
    }
}
