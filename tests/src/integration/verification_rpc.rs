//! # Signature Verification over the Broker
//!
//! `DocumentService::verify` against a fake remote verifier consuming
//! `verify.request`:
//!
//! - concurrent calls each receive their own reply even when replies arrive
//!   out of order
//! - replies with a foreign correlation token are discarded
//! - timeouts and caller cancellation leave no reply queue behind
//! - verification policy and recording of verified signatures

#[cfg(test)]
mod tests {
    use crate::support::{Behaviour, FakeVerifier, TestStack};
    use doc_01_documents::service::messages;
    use doc_01_documents::test_utils::make_test_document;
    use doc_01_documents::{DocumentApi, DocumentRepository, ServiceConfig, VerificationPolicy};
    use shared_bus::topology::VERIFY_REQUEST_QUEUE;
    use shared_types::{DocumentError, OperationContext, Validation, VerificationOutcome};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const DOC_ID: &str = "FACT-123456789";

    fn ctx() -> OperationContext {
        OperationContext::background()
    }

    async fn stack_with_document(config: ServiceConfig) -> TestStack {
        let stack = TestStack::with_config(config).await;
        stack
            .service
            .create(&ctx(), make_test_document(DOC_ID))
            .await
            .unwrap();
        stack
    }

    fn assert_no_reply_queues(stack: &TestStack) {
        assert!(
            stack.broker.server_named_queues().is_empty(),
            "dangling reply queues: {:?}",
            stack.broker.server_named_queues()
        );
    }

    // =========================================================================
    // CORRELATION
    // =========================================================================

    #[tokio::test]
    async fn test_concurrent_verifies_get_their_own_replies() {
        const CALLS: u64 = 8;
        let stack = stack_with_document(ServiceConfig::default()).await;

        // Later requests are answered first.
        let _verifier = FakeVerifier::start(&stack.broker, |request| {
            let i: u64 = request
                .signature
                .trim_start_matches("sig-")
                .parse()
                .unwrap_or(0);
            Behaviour::after(i % 2 == 0, Duration::from_millis((CALLS - i) * 20))
        })
        .await;

        let mut calls = Vec::new();
        for i in 0..CALLS {
            let service = Arc::clone(&stack.service);
            calls.push(tokio::spawn(async move {
                let outcome = service
                    .verify(&ctx(), make_test_document(DOC_ID), &format!("sig-{i}"))
                    .await;
                (i, outcome)
            }));
        }

        for call in calls {
            let (i, outcome) = call.await.unwrap();
            let expected = if i % 2 == 0 {
                VerificationOutcome::valid()
            } else {
                VerificationOutcome::invalid()
            };
            assert_eq!(outcome.unwrap(), expected, "call {i}");
        }

        let stats = stack.verifier.client().stats();
        assert_eq!(stats.calls_started.load(Ordering::Relaxed), CALLS);
        assert_eq!(stats.calls_completed.load(Ordering::Relaxed), CALLS);
        assert_eq!(stats.stray_replies.load(Ordering::Relaxed), 0);
        assert_no_reply_queues(&stack);
    }

    #[tokio::test]
    async fn test_foreign_correlation_id_is_ignored() {
        let stack = stack_with_document(ServiceConfig::default()).await;
        let _verifier =
            FakeVerifier::always(&stack.broker, Behaviour::StrayFirst { valid: true }).await;

        let outcome = stack
            .service
            .verify(&ctx(), make_test_document(DOC_ID), "sig")
            .await
            .unwrap();

        // The stray carried the opposite verdict.
        assert_eq!(outcome, VerificationOutcome::valid());
        let stats = stack.verifier.client().stats();
        assert!(stats.stray_replies.load(Ordering::Relaxed) >= 1);
        assert_no_reply_queues(&stack);
    }

    // =========================================================================
    // FAILURE MODES
    // =========================================================================

    #[tokio::test]
    async fn test_silent_verifier_times_out_without_dangling_queue() {
        let stack = stack_with_document(ServiceConfig {
            verification_timeout: Duration::from_millis(200),
            ..ServiceConfig::default()
        })
        .await;
        let verifier = FakeVerifier::always(&stack.broker, Behaviour::Silent).await;

        let started = Instant::now();
        let err = stack
            .service
            .verify(&ctx(), make_test_document(DOC_ID), "sig")
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(err, DocumentError::internal(messages::VERIFIER_FAILED));
        assert_eq!(err.status_code(), 500);
        assert!(elapsed >= Duration::from_millis(190), "returned after {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "returned after {elapsed:?}");

        assert_eq!(verifier.requests().len(), 1);
        let stats = stack.verifier.client().stats();
        assert_eq!(stats.timeouts.load(Ordering::Relaxed), 1);
        assert_no_reply_queues(&stack);
        // Only the fake verifier still consumes.
        assert_eq!(stack.broker.consumer_count(VERIFY_REQUEST_QUEUE), 1);
    }

    #[tokio::test]
    async fn test_caller_cancellation_aborts_the_call() {
        let stack = stack_with_document(ServiceConfig::default()).await;
        let _verifier = FakeVerifier::always(&stack.broker, Behaviour::Silent).await;

        let (cancel, op_ctx) = OperationContext::cancellable(None);
        let service = Arc::clone(&stack.service);
        let call = tokio::spawn(async move {
            service
                .verify(&op_ctx, make_test_document(DOC_ID), "sig")
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let err = tokio::time::timeout(Duration::from_secs(1), call)
            .await
            .expect("cancelled call returns promptly")
            .unwrap()
            .unwrap_err();
        assert_eq!(err, DocumentError::Cancelled);

        let stats = stack.verifier.client().stats();
        assert_eq!(stats.cancelled.load(Ordering::Relaxed), 1);
        assert_no_reply_queues(&stack);
    }

    #[tokio::test]
    async fn test_unreadable_reply_is_internal_error() {
        let stack = stack_with_document(ServiceConfig::default()).await;
        let _verifier = FakeVerifier::always(&stack.broker, Behaviour::Garbage).await;

        let err = stack
            .service
            .verify(&ctx(), make_test_document(DOC_ID), "sig")
            .await
            .unwrap_err();

        assert_eq!(err, DocumentError::internal(messages::VERIFIER_FAILED));
        let stats = stack.verifier.client().stats();
        assert_eq!(stats.serialization_errors.load(Ordering::Relaxed), 1);
        assert_no_reply_queues(&stack);
    }

    // =========================================================================
    // OUTCOMES
    // =========================================================================

    #[tokio::test]
    async fn test_verifier_message_passes_through() {
        let stack = stack_with_document(ServiceConfig::default()).await;
        let _verifier = FakeVerifier::always(
            &stack.broker,
            Behaviour::Reply {
                valid: false,
                message: "certificate revoked".into(),
                delay: Duration::ZERO,
            },
        )
        .await;

        let outcome = stack
            .service
            .verify(&ctx(), make_test_document(DOC_ID), "sig")
            .await
            .unwrap();

        assert!(!outcome.valid);
        assert_eq!(outcome.message, "certificate revoked");
    }

    #[tokio::test]
    async fn test_verify_does_not_touch_record_by_default() {
        let stack = stack_with_document(ServiceConfig::default()).await;
        let _verifier = FakeVerifier::always(&stack.broker, Behaviour::answer(true)).await;

        stack
            .service
            .verify(&ctx(), make_test_document(DOC_ID), "sig")
            .await
            .unwrap();

        let stored = stack.service.get(&ctx(), DOC_ID).await.unwrap();
        assert!(stored.validation.is_none());
    }

    #[tokio::test]
    async fn test_verified_signature_is_recorded_when_enabled() {
        let stack = stack_with_document(ServiceConfig {
            record_verified_signature: true,
            ..ServiceConfig::default()
        })
        .await;
        let _verifier = FakeVerifier::always(&stack.broker, Behaviour::answer(true)).await;

        stack
            .service
            .verify(&ctx(), make_test_document(DOC_ID), "sig-recorded")
            .await
            .unwrap();

        let stored = stack.service.get(&ctx(), DOC_ID).await.unwrap();
        let validation = stored.validation.expect("validation recorded");
        assert_eq!(validation.signature, "sig-recorded");
        assert!(!validation.validated_at.is_empty());
    }

    // =========================================================================
    // LOCAL-THEN-REMOTE POLICY
    // =========================================================================

    fn local_then_remote() -> ServiceConfig {
        ServiceConfig {
            verification_policy: VerificationPolicy::LocalThenRemote,
            ..ServiceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_local_policy_requires_recorded_validation() {
        let stack = stack_with_document(local_then_remote()).await;
        let verifier = FakeVerifier::always(&stack.broker, Behaviour::answer(true)).await;

        let err = stack
            .service
            .verify(&ctx(), make_test_document(DOC_ID), "sig")
            .await
            .unwrap_err();

        assert_eq!(err, DocumentError::validation(messages::NOT_VALIDATED));
        assert!(verifier.requests().is_empty());
    }

    #[tokio::test]
    async fn test_local_policy_mismatch_skips_remote() {
        let stack = stack_with_document(local_then_remote()).await;
        let verifier = FakeVerifier::always(&stack.broker, Behaviour::answer(true)).await;
        stack
            .repository
            .record_validation(
                DOC_ID,
                Validation {
                    signature: "recorded".into(),
                    ..Validation::default()
                },
            )
            .await
            .unwrap();

        let outcome = stack
            .service
            .verify(&ctx(), make_test_document(DOC_ID), "different")
            .await
            .unwrap();

        assert_eq!(outcome, VerificationOutcome::invalid());
        assert!(verifier.requests().is_empty());
        assert_eq!(stack.verifier.client().stats().calls_started.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_local_policy_match_asks_remote() {
        let stack = stack_with_document(local_then_remote()).await;
        let verifier = FakeVerifier::always(&stack.broker, Behaviour::answer(true)).await;
        stack
            .repository
            .record_validation(
                DOC_ID,
                Validation {
                    signature: "recorded".into(),
                    ..Validation::default()
                },
            )
            .await
            .unwrap();

        let outcome = stack
            .service
            .verify(&ctx(), make_test_document(DOC_ID), "recorded")
            .await
            .unwrap();

        assert_eq!(outcome, VerificationOutcome::valid());
        assert_eq!(verifier.requests().len(), 1);
    }
}
