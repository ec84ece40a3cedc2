//! # Core Domain Entities
//!
//! Defines the fiscal document model persisted by the store and exchanged
//! with the remote verifier.
//!
//! ## Identity
//!
//! - `document_id` (`documentId`): business key, immutable, unique.
//! - `uuid`: opaque identifier assigned once at creation.

use serde::{Deserialize, Serialize};

/// Estado recorded on a validation produced by a successful verification.
pub const VALIDATION_STATUS_VALID: &str = "VALIDO";

/// A single line of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Item {
    /// Free-text description of the line.
    #[serde(rename = "descripcion")]
    pub description: String,
    /// Unit price, must be strictly positive.
    #[serde(rename = "precioUnitario")]
    pub unit_price: f64,
    /// Quantity, must be strictly positive.
    #[serde(rename = "cantidad")]
    pub quantity: i64,
    /// Line total.
    #[serde(rename = "precioTotal")]
    pub line_total: f64,
    /// Line tax (IGV).
    #[serde(rename = "igvTotal")]
    pub line_tax: f64,
}

/// Signature record attached after an external verification succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Validation {
    /// When the signature was judged valid (RFC 3339).
    #[serde(rename = "fechaValidacion", skip_serializing_if = "String::is_empty")]
    pub validated_at: String,
    /// The signature that was judged valid.
    #[serde(rename = "firma", skip_serializing_if = "String::is_empty")]
    pub signature: String,
    /// Validation status label.
    #[serde(rename = "estado", skip_serializing_if = "String::is_empty")]
    pub status: String,
}

/// A fiscal document.
///
/// Missing fields decode to their zero value so that structural problems are
/// reported by the validator with a precise message instead of a JSON error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Document {
    /// Business key, `^[A-Z]{4}-[0-9]{9}$`.
    #[serde(rename = "documentId", alias = "idDocumento")]
    pub document_id: String,
    /// System-assigned opaque identifier.
    pub uuid: String,
    /// Issuer tax identifier (11 digits).
    #[serde(rename = "rucEmisor")]
    pub issuer_tax_id: String,
    /// Receiver tax identifier (11 digits).
    #[serde(rename = "rucReceptor")]
    pub receiver_tax_id: String,
    /// Issuance timestamp (RFC 3339), defaulted at creation when empty.
    #[serde(rename = "fechaEmision")]
    pub issued_at: String,
    /// Amount before taxes.
    #[serde(rename = "montoTotalSinImpuestos")]
    pub subtotal: f64,
    /// Tax amount.
    #[serde(rename = "igvTotal")]
    pub tax_total: f64,
    /// Total amount.
    #[serde(rename = "montoTotal")]
    pub total: f64,
    /// Ordered document lines, never empty once validated.
    pub items: Vec<Item>,
    /// Present only after a successful verification was recorded.
    #[serde(rename = "validacion", skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
}

impl Document {
    /// Whether the stored validation carries exactly this signature.
    pub fn has_signature(&self, signature: &str) -> bool {
        self.validation
            .as_ref()
            .is_some_and(|v| v.signature == signature)
    }
}

/// Result of a signature verification as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Whether the signature matches the document.
    pub valid: bool,
    /// Human-readable explanation.
    pub message: String,
}

impl VerificationOutcome {
    /// Message used when the verifier confirms the signature.
    pub const VALID_MESSAGE: &'static str =
        "the signature is valid and the document has not been modified";
    /// Message used when the signature does not match.
    pub const INVALID_MESSAGE: &'static str =
        "the signature is invalid or the document has been modified";

    /// Outcome for a confirmed signature.
    pub fn valid() -> Self {
        Self {
            valid: true,
            message: Self::VALID_MESSAGE.to_string(),
        }
    }

    /// Outcome for a rejected signature.
    pub fn invalid() -> Self {
        Self {
            valid: false,
            message: Self::INVALID_MESSAGE.to_string(),
        }
    }
}
