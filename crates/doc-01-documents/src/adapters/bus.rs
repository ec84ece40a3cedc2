//! # Broker Adapters
//!
//! Wires the document service's outbound ports to `shared-bus`.
//!
//! ```text
//! DocumentService ──document_created──→ BusEventPublisher ──→ documents / documents.created
//!                 ──verify────────────→ RpcSignatureVerifier ──→ verify.request
//!                                                   ↑
//!                                     reply on amq.gen-<uuid>
//! ```

use crate::ports::outbound::{DocumentEventPublisher, EventError, SignatureVerifier, VerifierError};
use async_trait::async_trait;
use shared_bus::{EventKind, EventPublisher, RpcClient, RpcError};
use shared_types::{DocumentCreatedEvent, OperationContext, VerificationReply, VerificationRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// =============================================================================
// EVENTS
// =============================================================================

/// Publishes document events through a `shared-bus` [`EventPublisher`].
pub struct BusEventPublisher {
    publisher: Arc<dyn EventPublisher>,
}

impl BusEventPublisher {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl DocumentEventPublisher for BusEventPublisher {
    async fn document_created(&self, event: DocumentCreatedEvent) -> Result<(), EventError> {
        let payload = serde_json::to_value(&event).map_err(|e| EventError(e.to_string()))?;
        self.publisher
            .publish(EventKind::DocumentCreated, payload)
            .await
            .map_err(|e| EventError(e.to_string()))
    }
}

// =============================================================================
// VERIFICATION
// =============================================================================

/// Remote verifier reached through correlated request/reply.
pub struct RpcSignatureVerifier {
    client: RpcClient,
    timeout: Duration,
}

impl RpcSignatureVerifier {
    pub fn new(client: RpcClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }
}

impl From<RpcError> for VerifierError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Timeout(_) => VerifierError::Timeout,
            RpcError::Cancelled => VerifierError::Cancelled,
            RpcError::Transport(msg) => VerifierError::Unavailable(msg),
            RpcError::Serialization(msg) => VerifierError::Malformed(msg),
        }
    }
}

#[async_trait]
impl SignatureVerifier for RpcSignatureVerifier {
    async fn verify(
        &self,
        ctx: &OperationContext,
        request: &VerificationRequest,
    ) -> Result<VerificationReply, VerifierError> {
        debug!(
            document_id = %request.document.document_id,
            queue = self.client.request_queue(),
            "Requesting remote signature verification"
        );
        let reply: VerificationReply = self.client.call(ctx, request, self.timeout).await?;
        Ok(reply)
    }
}
