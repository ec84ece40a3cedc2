//! # Structural Validator
//!
//! Pure checks on a candidate document. The first failing rule wins, in
//! this order:
//!
//! 1. `documentId` matches `^[A-Z]{4}-[0-9]{9}$`
//! 2. `rucEmisor` is exactly 11 ASCII digits
//! 3. `rucReceptor` is exactly 11 ASCII digits
//! 4. `montoTotalSinImpuestos`, `igvTotal`, `montoTotal` are > 0
//! 5. `items` is non-empty
//! 6. per item: `precioUnitario`, `cantidad`, `precioTotal`, `igvTotal` > 0
//! 7. `fechaEmision` parses as RFC 3339
//!
//! No cross-field arithmetic (line totals vs document totals) is enforced.

use chrono::{DateTime, SecondsFormat, Utc};
use shared_types::{Document, DocumentError, Item};

/// Length of a tax identifier.
pub const TAX_ID_LEN: usize = 11;

const ID_PREFIX_LEN: usize = 4;
const ID_SUFFIX_LEN: usize = 9;

/// Message reported for a malformed `documentId`.
pub const INVALID_DOCUMENT_ID: &str =
    "invalid documentId format, expected ABCD-012345678";

/// Validate `document`, reporting the first rule it breaks.
pub fn validate(document: &Document) -> Result<(), DocumentError> {
    if !is_valid_document_id(&document.document_id) {
        return Err(DocumentError::validation(INVALID_DOCUMENT_ID));
    }
    check_tax_id(&document.issuer_tax_id, "rucEmisor")?;
    check_tax_id(&document.receiver_tax_id, "rucReceptor")?;

    check_positive(document.subtotal, "montoTotalSinImpuestos")?;
    check_positive(document.tax_total, "igvTotal")?;
    check_positive(document.total, "montoTotal")?;

    if document.items.is_empty() {
        return Err(DocumentError::validation("there must be at least 1 item"));
    }
    for (index, item) in document.items.iter().enumerate() {
        check_item(index, item)?;
    }

    if DateTime::parse_from_rfc3339(&document.issued_at).is_err() {
        return Err(DocumentError::validation(
            "fechaEmision must be an ISO 8601 (RFC 3339) timestamp",
        ));
    }
    Ok(())
}

/// Fill fields that have a default. Currently only an empty `fechaEmision`,
/// which becomes `now` in UTC at second precision.
pub fn apply_defaults(document: &mut Document, now: DateTime<Utc>) {
    if document.issued_at.trim().is_empty() {
        document.issued_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    }
}

/// `^[A-Z]{4}-[0-9]{9}$`
pub fn is_valid_document_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    bytes.len() == ID_PREFIX_LEN + 1 + ID_SUFFIX_LEN
        && bytes[..ID_PREFIX_LEN].iter().all(u8::is_ascii_uppercase)
        && bytes[ID_PREFIX_LEN] == b'-'
        && bytes[ID_PREFIX_LEN + 1..].iter().all(u8::is_ascii_digit)
}

/// `^[0-9]{11}$`
pub fn is_valid_tax_id(tax_id: &str) -> bool {
    tax_id.len() == TAX_ID_LEN && tax_id.bytes().all(|b| b.is_ascii_digit())
}

fn check_tax_id(value: &str, field: &str) -> Result<(), DocumentError> {
    if is_valid_tax_id(value) {
        Ok(())
    } else {
        Err(DocumentError::validation(format!(
            "{field} must have {TAX_ID_LEN} digits"
        )))
    }
}

fn is_positive(value: f64) -> bool {
    !value.is_nan() && value > 0.0
}

fn check_positive(value: f64, field: &str) -> Result<(), DocumentError> {
    if is_positive(value) {
        Ok(())
    } else {
        Err(DocumentError::validation(format!("{field} must be positive")))
    }
}

fn check_item(index: usize, item: &Item) -> Result<(), DocumentError> {
    let item_error =
        |field: &str| DocumentError::validation(format!("{field} of item {index} must be positive"));

    if !is_positive(item.unit_price) {
        return Err(item_error("precioUnitario"));
    }
    if item.quantity <= 0 {
        return Err(item_error("cantidad"));
    }
    if !is_positive(item.line_total) {
        return Err(item_error("precioTotal"));
    }
    if !is_positive(item.line_tax) {
        return Err(item_error("igvTotal"));
    }
    Ok(())
}
