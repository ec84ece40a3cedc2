//! Properties of the structural validator.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use doc_01_documents::domain::validator::{
        apply_defaults, is_valid_document_id, is_valid_tax_id, validate, INVALID_DOCUMENT_ID,
    };
    use doc_01_documents::test_utils::make_test_document;
    use proptest::prelude::*;
    use shared_types::{DocumentError, ErrorKind};

    fn non_positive() -> impl Strategy<Value = f64> {
        prop_oneof![Just(0.0), Just(-0.0), Just(f64::NAN), -1.0e9..0.0f64]
    }

    proptest! {
        /// Every id of the documented shape is accepted.
        #[test]
        fn well_formed_ids_accepted(id in "[A-Z]{4}-[0-9]{9}") {
            prop_assert!(is_valid_document_id(&id));
            prop_assert!(validate(&make_test_document(&id)).is_ok());
        }

        /// Lowercase prefixes are rejected with the documented message.
        #[test]
        fn lowercase_prefix_rejected(id in "[a-z]{4}-[0-9]{9}") {
            prop_assert!(!is_valid_document_id(&id));
            prop_assert_eq!(
                validate(&make_test_document(&id)),
                Err(DocumentError::validation(INVALID_DOCUMENT_ID))
            );
        }

        /// Suffixes of the wrong length are rejected.
        #[test]
        fn wrong_suffix_length_rejected(
            id in prop_oneof!["[A-Z]{4}-[0-9]{0,8}", "[A-Z]{4}-[0-9]{10,14}"]
        ) {
            prop_assert!(!is_valid_document_id(&id));
        }

        /// The separator is mandatory.
        #[test]
        fn missing_separator_rejected(id in "[A-Z]{4}[0-9]{10}") {
            prop_assert!(!is_valid_document_id(&id));
        }

        /// Arbitrary text never panics the check.
        #[test]
        fn arbitrary_ids_do_not_panic(id in "\\PC{0,32}") {
            let _ = is_valid_document_id(&id);
        }

        /// Tax ids must be exactly eleven digits.
        #[test]
        fn tax_id_length_enforced(tax_id in prop_oneof!["[0-9]{0,10}", "[0-9]{12,20}"]) {
            prop_assert!(!is_valid_tax_id(&tax_id));

            let mut doc = make_test_document("FACT-123456789");
            doc.issuer_tax_id = tax_id;
            let err = validate(&doc).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::Validation);
            prop_assert!(err.to_string().contains("rucEmisor"));
        }

        /// Eleven-digit tax ids are accepted on both sides.
        #[test]
        fn eleven_digit_tax_ids_accepted(issuer in "[0-9]{11}", receiver in "[0-9]{11}") {
            let mut doc = make_test_document("FACT-123456789");
            doc.issuer_tax_id = issuer;
            doc.receiver_tax_id = receiver;
            prop_assert!(validate(&doc).is_ok());
        }

        /// A non-positive document total is reported by field name.
        #[test]
        fn non_positive_total_rejected(value in non_positive()) {
            let mut doc = make_test_document("FACT-123456789");
            doc.total = value;
            let err = validate(&doc).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::Validation);
            prop_assert!(err.to_string().contains("montoTotal"));
        }

        /// A non-positive line price names the offending item.
        #[test]
        fn non_positive_item_price_rejected(value in non_positive()) {
            let mut doc = make_test_document("FACT-123456789");
            doc.items[0].unit_price = value;
            let err = validate(&doc).unwrap_err();
            prop_assert!(err.to_string().contains("precioUnitario of item 0"));
        }

        /// An empty issue date becomes an RFC 3339 timestamp that validates.
        #[test]
        fn defaulted_issue_date_is_rfc3339(secs in 0i64..4_102_444_800) {
            let now = Utc.timestamp_opt(secs, 0).unwrap();
            let mut doc = make_test_document("FACT-123456789");
            doc.issued_at = String::new();

            apply_defaults(&mut doc, now);

            let parsed = DateTime::parse_from_rfc3339(&doc.issued_at).unwrap();
            prop_assert_eq!(parsed.timestamp(), secs);
            prop_assert!(validate(&doc).is_ok());
        }

        /// A supplied issue date is left alone.
        #[test]
        fn supplied_issue_date_kept(secs in 0i64..4_102_444_800) {
            let now = Utc.timestamp_opt(secs, 0).unwrap();
            let mut doc = make_test_document("FACT-123456789");
            let original = doc.issued_at.clone();

            apply_defaults(&mut doc, now);

            prop_assert_eq!(doc.issued_at, original);
        }
    }
}
