//! # Correlated RPC Client
//!
//! Turns the publish/subscribe broker into a synchronous-looking remote call.
//!
//! ## Flow
//!
//! ```text
//! call()
//!   │ 1. declare private reply queue (server-named, exclusive, auto-delete)
//!   │ 2. start auto-ack consumer on it
//!   │ 3. publish request: "" / <request queue>, correlation_id, reply_to
//!   ▼
//! select! ── caller cancelled ──────────────► RpcError::Cancelled
//!         ── deadline reached ──────────────► RpcError::Timeout
//!         ── reply with matching token ─────► decoded response
//!         ── reply with other / no token ───► discarded, keep waiting
//!         ── reply stream closed ───────────► RpcError::Transport
//! ```
//!
//! The consumer is dropped on every exit path, which cancels it at the broker
//! and lets the auto-delete reply queue disappear. Each call owns its reply
//! queue; there is no multiplexing between calls.

use crate::broker::{BrokerError, MessageProperties};
use crate::connection::ConnectionManager;
use crate::correlation::CorrelationId;
use crate::topology::DEFAULT_EXCHANGE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{ContextError, OperationContext};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default bound on a single call.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a call produced no response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// No matching reply arrived before the deadline.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the operation.
    #[error("call cancelled")]
    Cancelled,

    /// Broker failure, or the reply stream ended.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request could not be encoded or the matching reply decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<BrokerError> for RpcError {
    fn from(err: BrokerError) -> Self {
        RpcError::Transport(err.to_string())
    }
}

/// Counters for RPC activity.
#[derive(Debug, Default)]
pub struct RpcStats {
    pub calls_started: AtomicU64,
    pub calls_completed: AtomicU64,
    pub timeouts: AtomicU64,
    pub cancelled: AtomicU64,
    pub transport_errors: AtomicU64,
    pub serialization_errors: AtomicU64,
    /// Replies discarded because their token did not match.
    pub stray_replies: AtomicU64,
}

impl RpcStats {
    fn record(&self, result: &Result<impl Sized, RpcError>) {
        let counter = match result {
            Ok(_) => &self.calls_completed,
            Err(RpcError::Timeout(_)) => &self.timeouts,
            Err(RpcError::Cancelled) => &self.cancelled,
            Err(RpcError::Transport(_)) => &self.transport_errors,
            Err(RpcError::Serialization(_)) => &self.serialization_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// An in-flight request. Exists only for the lifetime of one call.
#[derive(Debug, Clone)]
pub struct CorrelatedRequest {
    pub payload: Vec<u8>,
    pub correlation_id: CorrelationId,
    pub reply_to: String,
    pub deadline: Instant,
}

/// Client issuing correlated calls to one request queue.
#[derive(Clone)]
pub struct RpcClient {
    connection: ConnectionManager,
    request_queue: String,
    stats: Arc<RpcStats>,
}

impl RpcClient {
    pub fn new(connection: ConnectionManager, request_queue: impl Into<String>) -> Self {
        Self {
            connection,
            request_queue: request_queue.into(),
            stats: Arc::new(RpcStats::default()),
        }
    }

    pub fn request_queue(&self) -> &str {
        &self.request_queue
    }

    pub fn stats(&self) -> &RpcStats {
        &self.stats
    }

    /// Send `request` and wait for the reply carrying the same correlation
    /// token.
    ///
    /// The effective deadline is the earlier of `now + timeout` and the
    /// context's own deadline.
    pub async fn call<Req, Resp>(
        &self,
        ctx: &OperationContext,
        request: &Req,
        timeout: Duration,
    ) -> Result<Resp, RpcError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        self.stats.calls_started.fetch_add(1, Ordering::Relaxed);
        let result = self.call_inner(ctx, request, timeout).await;
        self.stats.record(&result);
        result
    }

    async fn call_inner<Req, Resp>(
        &self,
        ctx: &OperationContext,
        request: &Req,
        timeout: Duration,
    ) -> Result<Resp, RpcError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        match ctx.check() {
            Err(ContextError::Cancelled) => return Err(RpcError::Cancelled),
            Err(ContextError::DeadlineExceeded) => return Err(RpcError::Timeout(Duration::ZERO)),
            Ok(()) => {}
        }

        let payload =
            serde_json::to_vec(request).map_err(|e| RpcError::Serialization(e.to_string()))?;

        let started = Instant::now();
        let mut deadline = started + timeout;
        if let Some(ctx_deadline) = ctx.deadline() {
            deadline = deadline.min(ctx_deadline);
        }
        // What the caller actually waited, which the context may have shortened.
        let wait = deadline.saturating_duration_since(started);

        let exchange = self.exchange(payload, deadline);

        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                debug!(queue = %self.request_queue, "RPC call cancelled");
                Err(RpcError::Cancelled)
            }
            _ = tokio::time::sleep_until(deadline) => {
                warn!(queue = %self.request_queue, ?wait, "RPC call timed out");
                Err(RpcError::Timeout(wait))
            }
            result = exchange => result,
        }
    }

    /// Publish the request and read the reply queue until the matching reply
    /// arrives. Dropping this future drops the consumer; dropping it while the
    /// reply queue is still being set up leaves the cleanup to
    /// [`ConnectionManager::open_reply_queue`].
    async fn exchange<Resp: DeserializeOwned>(
        &self,
        payload: Vec<u8>,
        deadline: Instant,
    ) -> Result<Resp, RpcError> {
        let (reply_to, mut consumer) = self.connection.open_reply_queue().await?;

        let request = CorrelatedRequest {
            payload,
            correlation_id: CorrelationId::new(),
            reply_to,
            deadline,
        };
        let token = request.correlation_id;

        let properties = MessageProperties::json()
            .with_correlation_id(token.to_string())
            .with_reply_to(request.reply_to.clone());
        self.connection
            .publish(DEFAULT_EXCHANGE, &self.request_queue, properties, request.payload)
            .await?;

        debug!(
            correlation_id = %token,
            reply_to = %request.reply_to,
            queue = %self.request_queue,
            "RPC request published"
        );

        while let Some(delivery) = consumer.recv().await {
            if !token.matches(delivery.properties.correlation_id.as_deref()) {
                self.stats.stray_replies.fetch_add(1, Ordering::Relaxed);
                debug!(
                    expected = %token,
                    got = ?delivery.properties.correlation_id,
                    "Discarding reply with foreign correlation id"
                );
                continue;
            }
            debug!(correlation_id = %token, "RPC reply received");
            return serde_json::from_slice(&delivery.body)
                .map_err(|e| RpcError::Serialization(e.to_string()));
        }

        Err(RpcError::Transport("reply stream closed".into()))
    }
}
