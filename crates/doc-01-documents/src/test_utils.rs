//! Test doubles for the outbound ports and a document factory.

use crate::ports::outbound::{
    DocumentEventPublisher, EventError, SignatureVerifier, TimeSource, VerifierError,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use shared_types::{
    Document, DocumentCreatedEvent, Item, OperationContext, VerificationReply,
    VerificationRequest,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// A document that passes validation.
pub fn make_test_document(document_id: &str) -> Document {
    Document {
        document_id: document_id.to_string(),
        uuid: String::new(),
        issuer_tax_id: "20123456789".into(),
        receiver_tax_id: "20987654321".into(),
        issued_at: "2026-02-12T10:00:00Z".into(),
        subtotal: 100.0,
        tax_total: 18.0,
        total: 118.0,
        items: vec![Item {
            description: "Item 1".into(),
            unit_price: 50.0,
            quantity: 2,
            line_total: 100.0,
            line_tax: 18.0,
        }],
        validation: None,
    }
}

/// Records published events; can be told to fail.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<DocumentCreatedEvent>>,
    failing: AtomicBool,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<DocumentCreatedEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl DocumentEventPublisher for RecordingEventPublisher {
    async fn document_created(&self, event: DocumentCreatedEvent) -> Result<(), EventError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EventError("broker unavailable".into()));
        }
        self.events.lock().push(event);
        Ok(())
    }
}

/// Verifier returning queued results in order, then `fallback`.
pub struct ScriptedVerifier {
    script: Mutex<VecDeque<Result<VerificationReply, VerifierError>>>,
    fallback: Result<VerificationReply, VerifierError>,
    requests: Mutex<Vec<VerificationRequest>>,
}

impl ScriptedVerifier {
    /// Always answers `valid`.
    pub fn answering(valid: bool) -> Self {
        Self::with_fallback(Ok(VerificationReply {
            valid,
            message: String::new(),
        }))
    }

    /// Always fails with `error`.
    pub fn failing(error: VerifierError) -> Self {
        Self::with_fallback(Err(error))
    }

    fn with_fallback(fallback: Result<VerificationReply, VerifierError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, result: Result<VerificationReply, VerifierError>) {
        self.script.lock().push_back(result);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SignatureVerifier for ScriptedVerifier {
    async fn verify(
        &self,
        _ctx: &OperationContext,
        request: &VerificationRequest,
    ) -> Result<VerificationReply, VerifierError> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(
            Utc.with_ymd_and_hms(2026, 2, 12, 12, 0, 0)
                .single()
                .unwrap_or_default(),
        )
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
