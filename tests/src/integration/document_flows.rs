//! # Document Lifecycle Flows
//!
//! The document service wired to the real broker adapters over the
//! in-process broker:
//!
//! 1. **create → documents.created**: the event reaches the durable queue
//! 2. **uuid stability**: the uuid assigned on create survives reads and
//!    updates
//! 3. **duplicate create**: rejected, store unchanged, no second event
//! 4. **verify on a missing id**: NotFound before anything is published
//! 5. **HTTP**: the gateway in front of the same stack

#[cfg(test)]
mod tests {
    use crate::support::{Behaviour, FakeVerifier, TestStack};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use doc_01_documents::service::messages;
    use doc_01_documents::test_utils::make_test_document;
    use doc_01_documents::DocumentApi;
    use doc_02_api_gateway::{build_router, AppState, GatewayConfig};
    use shared_bus::topology::{DOCUMENT_CREATED_QUEUE, VERIFY_REQUEST_QUEUE};
    use shared_bus::{MessageBroker, QueueOptions};
    use shared_types::{
        DocumentCreatedEvent, DocumentError, ErrorKind, OperationContext, VerificationOutcome,
    };
    use std::time::Duration;
    use tokio::time::timeout;
    use tower::ServiceExt;

    fn ctx() -> OperationContext {
        OperationContext::background()
    }

    // =========================================================================
    // CREATE / READ / UPDATE
    // =========================================================================

    #[tokio::test]
    async fn test_create_event_observed_on_documents_created() {
        let stack = TestStack::new().await;
        let mut consumer = stack.broker.consume(DOCUMENT_CREATED_QUEUE).await.unwrap();

        let created = stack
            .service
            .create(&ctx(), make_test_document("FACT-123456789"))
            .await
            .unwrap();

        let delivery = timeout(Duration::from_secs(1), consumer.recv())
            .await
            .expect("event within 1s")
            .expect("consumer open");
        assert_eq!(delivery.exchange, "documents");
        assert_eq!(delivery.routing_key, "documents.created");

        let event: DocumentCreatedEvent = serde_json::from_slice(&delivery.body).unwrap();
        assert_eq!(event.document_id, "FACT-123456789");
        assert_eq!(event.uuid, created.uuid);

        let raw: serde_json::Value = serde_json::from_slice(&delivery.body).unwrap();
        assert_eq!(raw["documentId"], "FACT-123456789");
    }

    #[tokio::test]
    async fn test_uuid_stable_across_read_and_update() {
        let stack = TestStack::new().await;
        let mut candidate = make_test_document("FACT-123456789");
        candidate.uuid = "client-chosen".into();

        let created = stack.service.create(&ctx(), candidate).await.unwrap();
        assert!(!created.uuid.is_empty());
        assert_ne!(created.uuid, "client-chosen");
        uuid::Uuid::parse_str(&created.uuid).expect("uuid v4");

        let read = stack.service.get(&ctx(), "FACT-123456789").await.unwrap();
        assert_eq!(read.uuid, created.uuid);

        let mut changed = make_test_document("FACT-123456789");
        changed.total = 236.0;
        changed.uuid = "another-client-value".into();
        let updated = stack
            .service
            .update(&ctx(), "FACT-123456789", changed)
            .await
            .unwrap();
        assert_eq!(updated.uuid, created.uuid);

        let listed = stack.service.list(&ctx()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].uuid, created.uuid);
        assert_eq!(listed[0].total, 236.0);
    }

    #[tokio::test]
    async fn test_update_can_rename_and_announces() {
        let stack = TestStack::new().await;
        let created = stack
            .service
            .create(&ctx(), make_test_document("FACT-000000001"))
            .await
            .unwrap();
        let before = stack.broker.message_count(DOCUMENT_CREATED_QUEUE);

        let renamed = stack
            .service
            .update(&ctx(), "FACT-000000001", make_test_document("FACT-000000002"))
            .await
            .unwrap();

        assert_eq!(renamed.uuid, created.uuid);
        assert_eq!(stack.broker.message_count(DOCUMENT_CREATED_QUEUE), before + 1);
        let err = stack.service.get(&ctx(), "FACT-000000001").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(stack.service.get(&ctx(), "FACT-000000002").await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts_and_store_unchanged() {
        let stack = TestStack::new().await;
        let first = stack
            .service
            .create(&ctx(), make_test_document("FACT-123456789"))
            .await
            .unwrap();

        let mut second = make_test_document("FACT-123456789");
        second.total = 999.0;
        let err = stack.service.create(&ctx(), second).await.unwrap_err();

        assert_eq!(err, DocumentError::conflict("FACT-123456789"));
        assert_eq!(err.status_code(), 409);

        let stored = stack.service.get(&ctx(), "FACT-123456789").await.unwrap();
        assert_eq!(stored, first);
        assert_eq!(stack.repository.len(), 1);
        assert_eq!(stack.broker.message_count(DOCUMENT_CREATED_QUEUE), 1);
    }

    #[tokio::test]
    async fn test_broker_outage_after_write_keeps_record() {
        let stack = TestStack::new().await;
        stack.broker.set_available(false);

        let err = stack
            .service
            .create(&ctx(), make_test_document("FACT-123456789"))
            .await
            .unwrap_err();
        assert_eq!(err, DocumentError::internal(messages::PUBLISH_FAILED));

        stack.broker.set_available(true);
        assert!(stack.service.get(&ctx(), "FACT-123456789").await.is_ok());
    }

    // =========================================================================
    // VERIFY PRECONDITIONS
    // =========================================================================

    #[tokio::test]
    async fn test_verify_missing_document_publishes_nothing() {
        let stack = TestStack::new().await;
        stack
            .broker
            .declare_queue(VERIFY_REQUEST_QUEUE, QueueOptions::durable())
            .await
            .unwrap();
        let published_before = stack.broker.published_count();

        let err = stack
            .service
            .verify(&ctx(), make_test_document("FACT-123456789"), "sig")
            .await
            .unwrap_err();

        assert_eq!(err, DocumentError::NotFound(messages::NOT_IN_SYSTEM.into()));
        assert_eq!(stack.broker.published_count(), published_before);
        assert_eq!(stack.broker.message_count(VERIFY_REQUEST_QUEUE), 0);
        assert!(stack.broker.server_named_queues().is_empty());
    }

    // =========================================================================
    // HTTP FRONT END
    // =========================================================================

    #[tokio::test]
    async fn test_http_create_then_verify_through_broker() {
        let stack = TestStack::new().await;
        let verifier = FakeVerifier::always(&stack.broker, Behaviour::answer(true)).await;

        let config = GatewayConfig::default();
        let router = build_router(
            AppState::new(
                stack.service.clone(),
                config.timeouts.clone(),
                OperationContext::background(),
            ),
            &config,
        );

        let doc = make_test_document("FACT-123456789");
        let response = router
            .clone()
            .oneshot(
                Request::post("/documents")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&doc).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = serde_json::json!({ "documento": doc, "firma": "sig-http" });
        let response = router
            .oneshot(
                Request::post("/documents/verify")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let outcome: VerificationOutcome = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(outcome, VerificationOutcome::valid());

        let seen = verifier.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].signature, "sig-http");
        assert_eq!(seen[0].document.document_id, "FACT-123456789");
    }
}
