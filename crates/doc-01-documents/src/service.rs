//! # Document Service
//!
//! Application service layer that implements the `DocumentApi` trait.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`DocumentApi`)
//! - Validates candidates with the domain validator
//! - Uses the outbound ports for storage, notifications and remote
//!   verification
//!
//! ## Flows
//!
//! ```text
//! create:  validate ─→ insert ─→ publish DocumentCreated
//! update:  validate ─→ find ─→ carry uuid, clear validacion ─→ replace ─→ publish
//! verify:  find stored ─→ [policy] ─→ RPC ─→ {valid, message} ─→ [record validacion]
//! ```
//!
//! Storage and publish failures surface as `Internal` with fixed messages; the
//! underlying error is logged, never returned. A failed publish after a
//! successful write leaves the record stored.

use crate::domain::config::{ServiceConfig, VerificationPolicy};
use crate::domain::validator;
use crate::ports::inbound::DocumentApi;
use crate::ports::outbound::{
    DocumentEventPublisher, DocumentRepository, RepositoryError, SignatureVerifier,
    SystemTimeSource, TimeSource, VerifierError,
};
use async_trait::async_trait;
use chrono::SecondsFormat;
use shared_types::{
    ContextError, Document, DocumentCreatedEvent, DocumentError, DocumentResult,
    OperationContext, Validation, VerificationOutcome, VerificationRequest,
    VALIDATION_STATUS_VALID,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Fixed client-facing failure messages.
pub mod messages {
    pub const CREATE_FAILED: &str = "error creating document";
    pub const LIST_FAILED: &str = "error fetching documents";
    pub const GET_FAILED: &str = "error fetching document";
    pub const UPDATE_FAILED: &str = "error updating document";
    pub const DELETE_FAILED: &str = "error deleting document";
    pub const VERIFY_FAILED: &str = "error verifying document";
    pub const PUBLISH_FAILED: &str = "error publishing document event";
    pub const VERIFIER_FAILED: &str = "error verifying signature with the validation service";
    pub const NOT_IN_SYSTEM: &str = "document does not exist in the system";
    pub const NOT_VALIDATED: &str = "document has not been validated";
}

/// Document lifecycle orchestration.
pub struct DocumentService {
    repository: Arc<dyn DocumentRepository>,
    events: Arc<dyn DocumentEventPublisher>,
    verifier: Arc<dyn SignatureVerifier>,
    clock: Arc<dyn TimeSource>,
    config: ServiceConfig,
}

impl DocumentService {
    /// Create a service using the wall clock.
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        events: Arc<dyn DocumentEventPublisher>,
        verifier: Arc<dyn SignatureVerifier>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repository,
            events,
            verifier,
            clock: Arc::new(SystemTimeSource),
            config,
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run a storage call bounded by `ctx`.
    async fn store<T, F>(&self, ctx: &OperationContext, failure: &'static str, fut: F)
        -> DocumentResult<T>
    where
        T: Send,
        F: Future<Output = Result<T, RepositoryError>> + Send,
    {
        match ctx.run(fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(repository_error(err, failure)),
            Err(err) => Err(context_error(err, failure)),
        }
    }

    async fn announce(&self, ctx: &OperationContext, document: &Document) -> DocumentResult<()> {
        let event = DocumentCreatedEvent::from_document(document);
        match ctx.run(self.events.document_created(event)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                error!(
                    document_id = %document.document_id,
                    error = %err,
                    "Document stored but event publish failed"
                );
                Err(DocumentError::internal(messages::PUBLISH_FAILED))
            }
            Err(err) => Err(context_error(err, messages::PUBLISH_FAILED)),
        }
    }

    /// Attach a validation record after a successful remote verification.
    /// Failures are logged only.
    async fn record_verification(&self, ctx: &OperationContext, document_id: &str, signature: &str) {
        let validation = Validation {
            validated_at: self.clock.now().to_rfc3339_opts(SecondsFormat::Secs, true),
            signature: signature.to_string(),
            status: VALIDATION_STATUS_VALID.to_string(),
        };
        match ctx
            .run(self.repository.record_validation(document_id, validation))
            .await
        {
            Ok(Ok(())) => debug!(document_id = %document_id, "Verified signature recorded"),
            Ok(Err(err)) => {
                warn!(document_id = %document_id, error = %err, "Failed to record verified signature")
            }
            Err(err) => {
                warn!(document_id = %document_id, error = %err, "Failed to record verified signature")
            }
        }
    }
}

fn repository_error(err: RepositoryError, failure: &'static str) -> DocumentError {
    match err {
        RepositoryError::NotFound(id) => DocumentError::not_found(&id),
        RepositoryError::Duplicate(id) => DocumentError::conflict(&id),
        RepositoryError::Backend(msg) => {
            error!(error = %msg, operation = failure, "Storage failure");
            DocumentError::internal(failure)
        }
    }
}

fn context_error(err: ContextError, failure: &'static str) -> DocumentError {
    match err {
        ContextError::Cancelled => DocumentError::Cancelled,
        ContextError::DeadlineExceeded => {
            warn!(operation = failure, "Operation deadline exceeded");
            DocumentError::internal(failure)
        }
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn create(
        &self,
        ctx: &OperationContext,
        candidate: Document,
    ) -> DocumentResult<Document> {
        let mut document = candidate;
        document.uuid = Uuid::new_v4().to_string();
        document.validation = None;
        validator::apply_defaults(&mut document, self.clock.now());
        validator::validate(&document)?;

        let stored = self
            .store(ctx, messages::CREATE_FAILED, self.repository.insert(document))
            .await?;
        self.announce(ctx, &stored).await?;

        info!(document_id = %stored.document_id, uuid = %stored.uuid, "Document created");
        Ok(stored)
    }

    async fn list(&self, ctx: &OperationContext) -> DocumentResult<Vec<Document>> {
        self.store(ctx, messages::LIST_FAILED, self.repository.find_all())
            .await
    }

    async fn get(&self, ctx: &OperationContext, document_id: &str) -> DocumentResult<Document> {
        self.store(ctx, messages::GET_FAILED, self.repository.find_by_id(document_id))
            .await?
            .ok_or_else(|| DocumentError::not_found(document_id))
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        document_id: &str,
        candidate: Document,
    ) -> DocumentResult<Document> {
        let mut document = candidate;
        validator::apply_defaults(&mut document, self.clock.now());
        validator::validate(&document)?;

        let existing = self
            .store(ctx, messages::UPDATE_FAILED, self.repository.find_by_id(document_id))
            .await?
            .ok_or_else(|| DocumentError::not_found(document_id))?;

        document.uuid = existing.uuid;
        document.validation = None;

        let stored = self
            .store(
                ctx,
                messages::UPDATE_FAILED,
                self.repository.replace(document_id, document),
            )
            .await?;
        self.announce(ctx, &stored).await?;

        info!(
            document_id = %document_id,
            new_document_id = %stored.document_id,
            "Document updated"
        );
        Ok(stored)
    }

    async fn delete(&self, ctx: &OperationContext, document_id: &str) -> DocumentResult<()> {
        self.store(ctx, messages::DELETE_FAILED, self.repository.remove(document_id))
            .await?;
        info!(document_id = %document_id, "Document deleted");
        Ok(())
    }

    async fn verify(
        &self,
        ctx: &OperationContext,
        candidate: Document,
        signature: &str,
    ) -> DocumentResult<VerificationOutcome> {
        let stored = self
            .store(
                ctx,
                messages::VERIFY_FAILED,
                self.repository.find_by_id(&candidate.document_id),
            )
            .await?
            .ok_or_else(|| DocumentError::NotFound(messages::NOT_IN_SYSTEM.to_string()))?;

        if self.config.verification_policy == VerificationPolicy::LocalThenRemote {
            let Some(validation) = stored.validation.as_ref() else {
                return Err(DocumentError::validation(messages::NOT_VALIDATED));
            };
            if validation.signature != signature {
                debug!(
                    document_id = %stored.document_id,
                    "Signature differs from recorded validation"
                );
                return Ok(VerificationOutcome::invalid());
            }
        }

        let request = VerificationRequest {
            document: candidate,
            signature: signature.to_string(),
        };
        let reply = match self.verifier.verify(ctx, &request).await {
            Ok(reply) => reply,
            Err(VerifierError::Cancelled) => return Err(DocumentError::Cancelled),
            Err(err) => {
                error!(
                    document_id = %stored.document_id,
                    error = %err,
                    "Remote verification failed"
                );
                return Err(DocumentError::internal(messages::VERIFIER_FAILED));
            }
        };

        info!(
            document_id = %stored.document_id,
            valid = reply.valid,
            "Signature verification completed"
        );

        if reply.valid && self.config.record_verified_signature {
            self.record_verification(ctx, &stored.document_id, signature)
                .await;
        }

        let outcome = match (reply.valid, reply.message.is_empty()) {
            (true, true) => VerificationOutcome::valid(),
            (false, true) => VerificationOutcome::invalid(),
            _ => VerificationOutcome::from(reply),
        };
        Ok(outcome)
    }
}
