//! # Event Publisher
//!
//! Fire-and-forget notifications on the durable document topology.

use crate::broker::{BrokerError, MessageProperties};
use crate::connection::ConnectionManager;
use crate::topology::{DOCUMENTS_EXCHANGE, DOCUMENT_CREATED_KEY};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{error, info};

/// Kinds of events the service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A document was stored. Payload: `{documentId, uuid}`.
    DocumentCreated,
}

impl EventKind {
    /// Exchange the event is published to.
    pub fn exchange(self) -> &'static str {
        match self {
            EventKind::DocumentCreated => DOCUMENTS_EXCHANGE,
        }
    }

    /// Routing key the event is published under.
    pub fn routing_key(self) -> &'static str {
        match self {
            EventKind::DocumentCreated => DOCUMENT_CREATED_KEY,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::DocumentCreated => f.write_str("document.created"),
        }
    }
}

/// Errors from publishing an event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("event serialization failed: {0}")]
    Serialization(String),

    #[error("broker rejected event: {0}")]
    Broker(#[from] BrokerError),
}

/// Trait for publishing events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish `payload` as JSON for the given event kind.
    async fn publish(&self, kind: EventKind, payload: serde_json::Value)
        -> Result<(), PublishError>;

    /// Events successfully handed to the broker.
    fn events_published(&self) -> u64;
}

/// [`EventPublisher`] backed by the shared broker connection.
pub struct BrokerEventPublisher {
    connection: ConnectionManager,
    events_published: AtomicU64,
}

impl BrokerEventPublisher {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            events_published: AtomicU64::new(0),
        }
    }

    /// Serialize `payload` and publish it.
    pub async fn publish_json<T: Serialize + Sync>(
        &self,
        kind: EventKind,
        payload: &T,
    ) -> Result<(), PublishError> {
        let value =
            serde_json::to_value(payload).map_err(|e| PublishError::Serialization(e.to_string()))?;
        self.publish(kind, value).await
    }
}

#[async_trait]
impl EventPublisher for BrokerEventPublisher {
    async fn publish(
        &self,
        kind: EventKind,
        payload: serde_json::Value,
    ) -> Result<(), PublishError> {
        let body =
            serde_json::to_vec(&payload).map_err(|e| PublishError::Serialization(e.to_string()))?;

        if let Err(e) = self
            .connection
            .publish(kind.exchange(), kind.routing_key(), MessageProperties::json(), body)
            .await
        {
            error!(event = %kind, error = %e, "Event publish failed");
            return Err(e.into());
        }

        self.events_published.fetch_add(1, Ordering::Relaxed);
        info!(
            event = %kind,
            exchange = kind.exchange(),
            routing_key = kind.routing_key(),
            "Event published"
        );
        Ok(())
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
