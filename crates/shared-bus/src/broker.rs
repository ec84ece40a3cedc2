//! # Broker Capability
//!
//! The narrow slice of AMQP 0-9-1 the workspace relies on: exchanges,
//! queues, bindings, publishing with properties and auto-ack consumers.
//!
//! Two drivers implement [`MessageBroker`]: the in-process
//! [`InMemoryBroker`](crate::memory::InMemoryBroker) and, behind the `amqp`
//! feature, `AmqpBroker` over RabbitMQ.

use async_trait::async_trait;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// Content type attached to every JSON payload.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Errors reported by a broker driver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// The broker cannot be reached.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The connection was closed by this process.
    #[error("broker connection closed")]
    Closed,

    /// A referenced exchange or queue does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Redeclaration with incompatible arguments.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Any other channel-level failure.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Exchange routing behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    /// Route to queues bound with exactly the routing key.
    Direct,
    /// Route to every bound queue.
    Fanout,
}

impl ExchangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
        }
    }
}

/// Queue declaration flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QueueOptions {
    /// Survives a broker restart.
    pub durable: bool,
    /// Private to the declaring connection.
    pub exclusive: bool,
    /// Removed once its last consumer cancels.
    pub auto_delete: bool,
}

impl QueueOptions {
    /// Long-lived, shared queue.
    pub const fn durable() -> Self {
        Self {
            durable: true,
            exclusive: false,
            auto_delete: false,
        }
    }

    /// Private, non-durable queue removed with its consumer.
    pub const fn ephemeral() -> Self {
        Self {
            durable: false,
            exclusive: true,
            auto_delete: true,
        }
    }
}

/// Message properties the workspace reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageProperties {
    pub content_type: Option<String>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
}

impl MessageProperties {
    /// Properties for a JSON payload.
    pub fn json() -> Self {
        Self {
            content_type: Some(CONTENT_TYPE_JSON.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    #[must_use]
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }
}

/// A message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub exchange: String,
    pub routing_key: String,
    pub properties: MessageProperties,
    pub body: Vec<u8>,
}

/// Broker operations used by the connection manager, RPC client and
/// publisher.
///
/// All consumers are auto-ack: a message is settled the moment it is handed
/// to the consumer.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Declare an exchange. Redeclaring with the same arguments is a no-op.
    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), BrokerError>;

    /// Declare a queue and return its name. An empty `name` asks the broker
    /// to generate one.
    async fn declare_queue(&self, name: &str, options: QueueOptions)
        -> Result<String, BrokerError>;

    /// Bind `queue` to `exchange` under `routing_key`.
    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError>;

    /// Publish `body`. The empty exchange name is the default exchange, which
    /// routes to the queue named by `routing_key`.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: MessageProperties,
        body: Vec<u8>,
    ) -> Result<(), BrokerError>;

    /// Start an auto-ack consumer on `queue`.
    async fn consume(&self, queue: &str) -> Result<Consumer, BrokerError>;

    /// Delete `queue`. Its consumers observe end of stream.
    async fn delete_queue(&self, queue: &str) -> Result<(), BrokerError>;

    /// Close the connection. Subsequent operations fail with
    /// [`BrokerError::Closed`].
    async fn close(&self) -> Result<(), BrokerError>;
}

type CancelFn = Box<dyn FnOnce() + Send + Sync>;

/// An active consumer on one queue.
///
/// Dropping the consumer cancels it at the broker, which in turn removes an
/// auto-delete queue that has no other consumer.
pub struct Consumer {
    tag: String,
    queue: String,
    receiver: mpsc::UnboundedReceiver<Delivery>,
    on_cancel: Option<CancelFn>,
}

impl Consumer {
    /// Wrap a delivery channel. `on_cancel` runs exactly once, on drop.
    pub fn new(
        tag: impl Into<String>,
        queue: impl Into<String>,
        receiver: mpsc::UnboundedReceiver<Delivery>,
        on_cancel: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            tag: tag.into(),
            queue: queue.into(),
            receiver,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Next delivery, or `None` once the broker side is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }
}

impl Stream for Consumer {
    type Item = Delivery;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(cancel) = self.on_cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("tag", &self.tag)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}
