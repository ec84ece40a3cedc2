//! Broker wrappers for exercising slow paths.

use crate::broker::{
    BrokerError, Consumer, ExchangeKind, MessageBroker, MessageProperties, QueueOptions,
};
use crate::memory::InMemoryBroker;
use async_trait::async_trait;
use std::time::Duration;

/// Delegates to an [`InMemoryBroker`] but takes `delay` to start a consumer,
/// like a network round trip to a remote broker.
pub struct SlowConsumeBroker {
    inner: InMemoryBroker,
    delay: Duration,
}

impl SlowConsumeBroker {
    pub fn new(inner: InMemoryBroker, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl MessageBroker for SlowConsumeBroker {
    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), BrokerError> {
        self.inner.declare_exchange(name, kind, durable).await
    }

    async fn declare_queue(
        &self,
        name: &str,
        options: QueueOptions,
    ) -> Result<String, BrokerError> {
        self.inner.declare_queue(name, options).await
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError> {
        self.inner.bind_queue(queue, exchange, routing_key).await
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: MessageProperties,
        body: Vec<u8>,
    ) -> Result<(), BrokerError> {
        self.inner
            .publish(exchange, routing_key, properties, body)
            .await
    }

    async fn consume(&self, queue: &str) -> Result<Consumer, BrokerError> {
        tokio::time::sleep(self.delay).await;
        self.inner.consume(queue).await
    }

    async fn delete_queue(&self, queue: &str) -> Result<(), BrokerError> {
        self.inner.delete_queue(queue).await
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.inner.close().await
    }
}
