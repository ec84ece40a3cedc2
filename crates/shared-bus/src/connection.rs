//! # Connection Manager
//!
//! Owns the process-wide broker handle. On connect it declares the durable
//! document topology; afterwards it serves publishes and ephemeral reply
//! queues to any number of concurrent tasks.

use crate::broker::{BrokerError, Consumer, MessageBroker, MessageProperties, QueueOptions};
use crate::topology;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Shared broker connection.
#[derive(Clone)]
pub struct ConnectionManager {
    broker: Arc<dyn MessageBroker>,
    closed: Arc<AtomicBool>,
}

impl ConnectionManager {
    /// Wrap `broker` and declare the document topology.
    pub async fn connect(broker: Arc<dyn MessageBroker>) -> Result<Self, BrokerError> {
        topology::declare_topology(broker.as_ref()).await?;
        info!("Broker connection established");
        Ok(Self {
            broker,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Dial RabbitMQ at `uri` and declare the document topology.
    #[cfg(feature = "amqp")]
    pub async fn connect_amqp(uri: &str) -> Result<Self, BrokerError> {
        let broker = crate::amqp::AmqpBroker::connect(uri).await?;
        Self::connect(Arc::new(broker)).await
    }

    /// The underlying broker handle.
    pub fn broker(&self) -> Arc<dyn MessageBroker> {
        Arc::clone(&self.broker)
    }

    pub async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: MessageProperties,
        body: Vec<u8>,
    ) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.broker
            .publish(exchange, routing_key, properties, body)
            .await
    }

    /// Declare a private, server-named, exclusive, auto-delete, non-durable
    /// queue and return its name.
    pub async fn declare_reply_queue(&self) -> Result<String, BrokerError> {
        self.ensure_open()?;
        let name = self
            .broker
            .declare_queue("", QueueOptions::ephemeral())
            .await?;
        debug!(queue = %name, "Reply queue declared");
        Ok(name)
    }

    /// Start an auto-ack consumer on an ephemeral queue. Dropping the
    /// returned consumer releases the queue.
    pub async fn consume_ephemeral(&self, queue: &str) -> Result<Consumer, BrokerError> {
        self.ensure_open()?;
        match self.broker.consume(queue).await {
            Ok(consumer) => Ok(consumer),
            Err(e) => {
                // No consumer ever attached, so auto-delete will not fire.
                if let Err(cleanup) = self.broker.delete_queue(queue).await {
                    warn!(queue = %queue, error = %cleanup, "Failed to delete orphaned reply queue");
                }
                Err(e)
            }
        }
    }

    /// Declare a reply queue and attach a consumer to it.
    ///
    /// Both steps run on a detached task and always complete. If the caller
    /// stops waiting in between, the finished consumer is dropped on that
    /// task, which releases the queue at the broker.
    pub async fn open_reply_queue(&self) -> Result<(String, Consumer), BrokerError> {
        self.ensure_open()?;
        let (tx, rx) = oneshot::channel();
        let conn = self.clone();
        tokio::spawn(async move {
            let opened = match conn.declare_reply_queue().await {
                Ok(queue) => conn
                    .consume_ephemeral(&queue)
                    .await
                    .map(|consumer| (queue, consumer)),
                Err(e) => Err(e),
            };
            if let Err(Ok((queue, consumer))) = tx.send(opened) {
                debug!(queue = %queue, "Reply queue no longer wanted, releasing");
                drop(consumer);
            }
        });
        rx.await
            .map_err(|_| BrokerError::Channel("reply queue setup aborted".into()))?
    }

    /// Close the connection. Idempotent.
    pub async fn close(&self) -> Result<(), BrokerError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Closing broker connection");
        self.broker.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }
        Ok(())
    }
}
