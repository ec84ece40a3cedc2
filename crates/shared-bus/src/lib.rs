//! # Shared Bus - Broker Plumbing
//!
//! Everything the document service needs from a message broker:
//!
//! - [`MessageBroker`]: capability trait over exchanges, queues, bindings,
//!   publishing and auto-ack consumers.
//! - [`InMemoryBroker`]: in-process driver with AMQP routing semantics.
//! - `AmqpBroker` (feature `amqp`): RabbitMQ driver.
//! - [`ConnectionManager`]: one shared connection, topology declared on
//!   connect.
//! - [`RpcClient`]: correlated request/reply over a private reply queue.
//! - [`BrokerEventPublisher`]: fire-and-forget event publishing.
//!
//! ## Request/Reply
//!
//! ```text
//! ┌──────────────┐  verify.request   ┌──────────────┐
//! │  RpcClient   │ ────────────────→ │   Verifier   │
//! │              │  correlation_id   │  (external)  │
//! │              │  reply_to         │              │
//! │              │ ←──────────────── │              │
//! └──────────────┘  amq.gen-<uuid>   └──────────────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

#[cfg(feature = "amqp")]
pub mod amqp;
pub mod broker;
pub mod connection;
pub mod correlation;
pub mod memory;
pub mod publisher;
pub mod rpc;
pub mod topology;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export main types
#[cfg(feature = "amqp")]
pub use amqp::AmqpBroker;
pub use broker::{
    BrokerError, Consumer, Delivery, ExchangeKind, MessageBroker, MessageProperties,
    QueueOptions, CONTENT_TYPE_JSON,
};
pub use connection::ConnectionManager;
pub use correlation::CorrelationId;
pub use memory::InMemoryBroker;
pub use publisher::{BrokerEventPublisher, EventKind, EventPublisher, PublishError};
pub use rpc::{CorrelatedRequest, RpcClient, RpcError, RpcStats, DEFAULT_RPC_TIMEOUT};
