//! # Operation Context
//!
//! Carries a deadline and a cancellation signal through one logical
//! operation. Every store, publish and RPC call made on behalf of a request is
//! bounded by the context it was given.
//!
//! Cancellation uses `tokio::sync::watch` channels: a [`CancelHandle`] flips
//! its value once and every context holding the matching receiver observes
//! it. A context may listen to several handles (see
//! [`OperationContext::linked`]), e.g. one per request plus one for process
//! shutdown.

use futures::future::select_all;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why an operation context stopped an operation.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
    #[error("operation cancelled")]
    Cancelled,
}

/// Deadline plus cancellation signal for a single operation.
#[derive(Debug, Clone)]
pub struct OperationContext {
    deadline: Option<Instant>,
    cancel_rxs: Vec<watch::Receiver<bool>>,
}

/// Owner side of an [`OperationContext`]'s cancellation signal.
///
/// Dropping the handle does not cancel the context.
#[derive(Debug)]
pub struct CancelHandle {
    cancel_tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel every context listening to this handle.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }
}

impl OperationContext {
    /// A context without a deadline that can never be cancelled.
    pub fn background() -> Self {
        let (_handle, ctx) = Self::cancellable(None);
        ctx
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> (CancelHandle, Self) {
        Self::cancellable(Some(Instant::now() + timeout))
    }

    /// A context with an optional absolute deadline.
    pub fn cancellable(deadline: Option<Instant>) -> (CancelHandle, Self) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (
            CancelHandle { cancel_tx },
            Self {
                deadline,
                cancel_rxs: vec![cancel_rx],
            },
        )
    }

    /// Derive a context that shares this one's cancellation and whose
    /// deadline is the earlier of the two.
    pub fn child(&self, timeout: Duration) -> Self {
        Self {
            deadline: Some(self.earlier_deadline(timeout)),
            cancel_rxs: self.cancel_rxs.clone(),
        }
    }

    /// Like [`child`](Self::child), but also cancellable through the returned
    /// handle without affecting this context.
    pub fn linked(&self, timeout: Duration) -> (CancelHandle, Self) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let mut cancel_rxs = self.cancel_rxs.clone();
        cancel_rxs.push(cancel_rx);
        (
            CancelHandle { cancel_tx },
            Self {
                deadline: Some(self.earlier_deadline(timeout)),
                cancel_rxs,
            },
        )
    }

    fn earlier_deadline(&self, timeout: Duration) -> Instant {
        let candidate = Instant::now() + timeout;
        match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when the context has none.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_rxs.iter().any(|rx| *rx.borrow())
    }

    /// Check the context without waiting.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the context is cancelled. Pends forever otherwise.
    pub async fn cancelled(&self) {
        let waits = self.cancel_rxs.iter().map(|rx| {
            let mut rx = rx.clone();
            Box::pin(async move {
                let observed = rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
                if observed.is_err() {
                    // Handle dropped without cancelling.
                    std::future::pending::<()>().await;
                }
            })
        });
        select_all(waits).await;
    }

    /// Resolves at the deadline. Pends forever without one.
    pub async fn expired(&self) {
        match self.deadline {
            Some(d) => tokio::time::sleep_until(d).await,
            None => std::future::pending::<()>().await,
        }
    }

    /// Run `fut` bounded by this context.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ContextError>
    where
        F: Future<Output = T>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ContextError::Cancelled),
            _ = self.expired() => Err(ContextError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::background()
    }
}
