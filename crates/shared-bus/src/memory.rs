//! # In-Memory Broker
//!
//! In-process [`MessageBroker`] with the AMQP routing semantics the workspace
//! depends on:
//!
//! - the default exchange (`""`) routes to the queue named by the routing key;
//! - direct exchanges route by exact binding key, fanout to every binding;
//! - a queue declared with an empty name gets a server name `amq.gen-<uuid>`;
//! - an auto-delete queue is removed when its last consumer cancels;
//! - messages for a queue without consumers are buffered;
//! - unroutable messages are dropped.
//!
//! Fault injection ([`InMemoryBroker::set_available`]) and introspection
//! helpers exist for tests.

use crate::broker::{
    BrokerError, Consumer, Delivery, ExchangeKind, MessageBroker, MessageProperties, QueueOptions,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Prefix of server-generated queue names.
pub const SERVER_NAMED_PREFIX: &str = "amq.gen-";

struct QueueState {
    options: QueueOptions,
    buffer: VecDeque<Delivery>,
    consumers: Vec<(String, mpsc::UnboundedSender<Delivery>)>,
    next_consumer: usize,
    /// Set once the queue had at least one consumer.
    consumed: bool,
}

impl QueueState {
    fn new(options: QueueOptions) -> Self {
        Self {
            options,
            buffer: VecDeque::new(),
            consumers: Vec::new(),
            next_consumer: 0,
            consumed: false,
        }
    }

    /// Hand the delivery to the next live consumer, round-robin. Buffers it
    /// when no consumer is left.
    fn deliver(&mut self, delivery: Delivery) {
        let mut delivery = delivery;
        while !self.consumers.is_empty() {
            let idx = self.next_consumer % self.consumers.len();
            match self.consumers[idx].1.send(delivery) {
                Ok(()) => {
                    self.next_consumer = idx + 1;
                    return;
                }
                Err(mpsc::error::SendError(returned)) => {
                    // Receiver went away before its cancel ran.
                    self.consumers.remove(idx);
                    delivery = returned;
                }
            }
        }
        self.buffer.push_back(delivery);
    }
}

struct ExchangeState {
    kind: ExchangeKind,
    durable: bool,
    /// `(routing_key, queue)` pairs.
    bindings: Vec<(String, String)>,
}

#[derive(Default)]
struct BrokerState {
    available: bool,
    closed: bool,
    queues: HashMap<String, QueueState>,
    exchanges: HashMap<String, ExchangeState>,
    next_consumer_tag: u64,
}

impl BrokerState {
    fn check(&self) -> Result<(), BrokerError> {
        if self.closed {
            return Err(BrokerError::Closed);
        }
        if !self.available {
            return Err(BrokerError::Unavailable("in-memory broker offline".into()));
        }
        Ok(())
    }

    fn remove_queue(&mut self, name: &str) {
        self.queues.remove(name);
        for exchange in self.exchanges.values_mut() {
            exchange.bindings.retain(|(_, q)| q != name);
        }
    }

    fn cancel_consumer(&mut self, queue: &str, tag: &str) {
        let Some(state) = self.queues.get_mut(queue) else {
            return;
        };
        state.consumers.retain(|(t, _)| t != tag);
        if state.options.auto_delete && state.consumed && state.consumers.is_empty() {
            debug!(queue = %queue, "Auto-delete queue removed");
            self.remove_queue(queue);
        }
    }
}

/// Process-local broker shared through `Arc` handles.
#[derive(Clone)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    published: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl InMemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState {
                available: true,
                ..BrokerState::default()
            })),
            published: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Simulate the broker going away (`false`) or coming back (`true`).
    /// Existing consumers keep their streams.
    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    pub fn queue_exists(&self, queue: &str) -> bool {
        self.state.lock().queues.contains_key(queue)
    }

    pub fn consumer_count(&self, queue: &str) -> usize {
        self.state
            .lock()
            .queues
            .get(queue)
            .map_or(0, |q| q.consumers.len())
    }

    /// Messages buffered in `queue` waiting for a consumer.
    pub fn message_count(&self, queue: &str) -> usize {
        self.state
            .lock()
            .queues
            .get(queue)
            .map_or(0, |q| q.buffer.len())
    }

    pub fn queue_count(&self) -> usize {
        self.state.lock().queues.len()
    }

    /// Names of server-generated queues currently alive.
    pub fn server_named_queues(&self) -> Vec<String> {
        self.state
            .lock()
            .queues
            .keys()
            .filter(|name| name.starts_with(SERVER_NAMED_PREFIX))
            .cloned()
            .collect()
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Messages that matched no queue.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        state.check()?;
        if name.is_empty() {
            return Err(BrokerError::PreconditionFailed(
                "the default exchange cannot be declared".into(),
            ));
        }
        match state.exchanges.get(name) {
            Some(existing) if existing.kind != kind || existing.durable != durable => {
                Err(BrokerError::PreconditionFailed(format!(
                    "exchange {name} exists with type {}",
                    existing.kind.as_str()
                )))
            }
            Some(_) => Ok(()),
            None => {
                state.exchanges.insert(
                    name.to_string(),
                    ExchangeState {
                        kind,
                        durable,
                        bindings: Vec::new(),
                    },
                );
                debug!(exchange = %name, kind = kind.as_str(), "Exchange declared");
                Ok(())
            }
        }
    }

    async fn declare_queue(
        &self,
        name: &str,
        options: QueueOptions,
    ) -> Result<String, BrokerError> {
        let mut state = self.state.lock();
        state.check()?;
        let name = if name.is_empty() {
            format!("{SERVER_NAMED_PREFIX}{}", uuid::Uuid::new_v4().simple())
        } else {
            name.to_string()
        };
        match state.queues.get(&name) {
            Some(existing) if existing.options != options => Err(
                BrokerError::PreconditionFailed(format!("queue {name} exists with other flags")),
            ),
            Some(_) => Ok(name),
            None => {
                state.queues.insert(name.clone(), QueueState::new(options));
                debug!(queue = %name, ?options, "Queue declared");
                Ok(name)
            }
        }
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        state.check()?;
        if !state.queues.contains_key(queue) {
            return Err(BrokerError::NotFound(format!("queue {queue}")));
        }
        let Some(ex) = state.exchanges.get_mut(exchange) else {
            return Err(BrokerError::NotFound(format!("exchange {exchange}")));
        };
        let binding = (routing_key.to_string(), queue.to_string());
        if !ex.bindings.contains(&binding) {
            ex.bindings.push(binding);
        }
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: MessageProperties,
        body: Vec<u8>,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        state.check()?;

        let targets: Vec<String> = if exchange.is_empty() {
            vec![routing_key.to_string()]
        } else {
            let Some(ex) = state.exchanges.get(exchange) else {
                return Err(BrokerError::NotFound(format!("exchange {exchange}")));
            };
            ex.bindings
                .iter()
                .filter(|(key, _)| ex.kind == ExchangeKind::Fanout || key == routing_key)
                .map(|(_, q)| q.clone())
                .collect()
        };

        self.published.fetch_add(1, Ordering::Relaxed);
        let delivery = Delivery {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            properties,
            body,
        };

        let mut routed = false;
        for queue in targets {
            if let Some(q) = state.queues.get_mut(&queue) {
                q.deliver(delivery.clone());
                routed = true;
            }
        }
        if !routed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(exchange = %exchange, routing_key = %routing_key, "Unroutable message dropped");
        }
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Consumer, BrokerError> {
        let mut guard = self.state.lock();
        guard.check()?;
        guard.next_consumer_tag += 1;
        let tag = format!("ctag-{}", guard.next_consumer_tag);

        let Some(q) = guard.queues.get_mut(queue) else {
            return Err(BrokerError::NotFound(format!("queue {queue}")));
        };
        let (tx, rx) = mpsc::unbounded_channel();
        while let Some(pending) = q.buffer.pop_front() {
            // Receiver is alive here.
            let _ = tx.send(pending);
        }
        q.consumers.push((tag.clone(), tx));
        q.consumed = true;
        drop(guard);

        let state = Arc::clone(&self.state);
        let cancel_queue = queue.to_string();
        let cancel_tag = tag.clone();
        Ok(Consumer::new(tag, queue, rx, move || {
            state.lock().cancel_consumer(&cancel_queue, &cancel_tag);
        }))
    }

    async fn delete_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        state.check()?;
        state.remove_queue(queue);
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        // Dropping the senders ends every consumer stream.
        for q in state.queues.values_mut() {
            q.consumers.clear();
        }
        let exclusive: Vec<String> = state
            .queues
            .iter()
            .filter(|(_, q)| q.options.exclusive || q.options.auto_delete)
            .map(|(name, _)| name.clone())
            .collect();
        for name in exclusive {
            state.remove_queue(&name);
        }
        debug!("In-memory broker closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> MessageProperties {
        MessageProperties::json()
    }

    #[tokio::test]
    async fn test_default_exchange_routes_by_queue_name() {
        let broker = InMemoryBroker::new();
        let queue = broker
            .declare_queue("verify.request", QueueOptions::durable())
            .await
            .unwrap();
        let mut consumer = broker.consume(&queue).await.unwrap();

        broker
            .publish("", "verify.request", props(), b"{}".to_vec())
            .await
            .unwrap();

        let delivery = consumer.recv().await.unwrap();
        assert_eq!(delivery.routing_key, "verify.request");
        assert_eq!(delivery.body, b"{}");
    }

    #[tokio::test]
    async fn test_direct_exchange_routes_by_binding() {
        let broker = InMemoryBroker::new();
        broker
            .declare_exchange("documents", ExchangeKind::Direct, true)
            .await
            .unwrap();
        broker
            .declare_queue("documents.created", QueueOptions::durable())
            .await
            .unwrap();
        broker
            .bind_queue("documents.created", "documents", "documents.created")
            .await
            .unwrap();

        broker
            .publish("documents", "documents.created", props(), b"a".to_vec())
            .await
            .unwrap();
        broker
            .publish("documents", "documents.other", props(), b"b".to_vec())
            .await
            .unwrap();

        assert_eq!(broker.message_count("documents.created"), 1);
        assert_eq!(broker.dropped_count(), 1);
    }

    #[tokio::test]
    async fn test_buffered_messages_reach_late_consumer() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q", QueueOptions::durable()).await.unwrap();
        broker.publish("", "q", props(), b"1".to_vec()).await.unwrap();
        broker.publish("", "q", props(), b"2".to_vec()).await.unwrap();
        assert_eq!(broker.message_count("q"), 2);

        let mut consumer = broker.consume("q").await.unwrap();
        assert_eq!(consumer.recv().await.unwrap().body, b"1");
        assert_eq!(consumer.recv().await.unwrap().body, b"2");
        assert_eq!(broker.message_count("q"), 0);
    }

    #[tokio::test]
    async fn test_server_named_auto_delete_queue_lifecycle() {
        let broker = InMemoryBroker::new();
        let name = broker
            .declare_queue("", QueueOptions::ephemeral())
            .await
            .unwrap();
        assert!(name.starts_with(SERVER_NAMED_PREFIX));

        let consumer = broker.consume(&name).await.unwrap();
        assert_eq!(broker.consumer_count(&name), 1);

        drop(consumer);
        assert!(!broker.queue_exists(&name));
        assert!(broker.server_named_queues().is_empty());
    }

    #[tokio::test]
    async fn test_redeclare_with_other_flags_fails() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q", QueueOptions::durable()).await.unwrap();
        let err = broker
            .declare_queue("q", QueueOptions::ephemeral())
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::PreconditionFailed(_)));

        broker
            .declare_exchange("documents", ExchangeKind::Direct, true)
            .await
            .unwrap();
        let err = broker
            .declare_exchange("documents", ExchangeKind::Fanout, true)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn test_unavailable_broker_rejects_operations() {
        let broker = InMemoryBroker::new();
        broker.set_available(false);
        let err = broker.publish("", "q", props(), vec![]).await.unwrap_err();
        assert!(matches!(err, BrokerError::Unavailable(_)));

        broker.set_available(true);
        broker.publish("", "q", props(), vec![]).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_queue_ends_consumer_stream() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q", QueueOptions::durable()).await.unwrap();
        let mut consumer = broker.consume("q").await.unwrap();

        broker.delete_queue("q").await.unwrap();
        assert!(consumer.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_close_ends_streams_and_rejects_operations() {
        let broker = InMemoryBroker::new();
        let name = broker
            .declare_queue("", QueueOptions::ephemeral())
            .await
            .unwrap();
        let mut consumer = broker.consume(&name).await.unwrap();

        broker.close().await.unwrap();
        assert!(consumer.recv().await.is_none());
        assert_eq!(
            broker.declare_queue("x", QueueOptions::durable()).await,
            Err(BrokerError::Closed)
        );
    }

    #[tokio::test]
    async fn test_round_robin_between_consumers() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q", QueueOptions::durable()).await.unwrap();
        let mut a = broker.consume("q").await.unwrap();
        let mut b = broker.consume("q").await.unwrap();

        broker.publish("", "q", props(), b"1".to_vec()).await.unwrap();
        broker.publish("", "q", props(), b"2".to_vec()).await.unwrap();

        assert_eq!(a.recv().await.unwrap().body, b"1");
        assert_eq!(b.recv().await.unwrap().body, b"2");
    }
}
