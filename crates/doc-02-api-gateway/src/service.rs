//! API Gateway service - binds the HTTP listener and serves until shutdown.

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::handlers::AppState;
use crate::router::build_router;
use axum::Router;
use doc_01_documents::DocumentApi;
use shared_types::{CancelHandle, OperationContext};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Triggers a graceful shutdown of a running gateway.
///
/// Shutting down stops accepting connections and cancels the operation
/// context of every in-flight request, which then answer 503.
#[derive(Clone)]
pub struct ShutdownHandle {
    cancel: Arc<CancelHandle>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            info!("Gateway shutdown requested");
        }
        self.cancel.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// API Gateway service state
pub struct ApiGatewayService {
    config: GatewayConfig,
    api: Arc<dyn DocumentApi>,
    shutdown: ShutdownHandle,
    root: OperationContext,
}

impl ApiGatewayService {
    /// Create a new API Gateway service
    pub fn new(config: GatewayConfig, api: Arc<dyn DocumentApi>) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let (cancel, root) = OperationContext::cancellable(None);
        Ok(Self {
            config,
            api,
            shutdown: ShutdownHandle {
                cancel: Arc::new(cancel),
            },
            root,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Build the HTTP router bound to this service's shutdown signal.
    pub fn router(&self) -> Router {
        let state = AppState::new(
            Arc::clone(&self.api),
            self.config.timeouts.clone(),
            self.root.clone(),
        );
        build_router(state, &self.config)
    }

    /// Bind the configured HTTP address.
    pub async fn bind(&self) -> Result<TcpListener, GatewayError> {
        let addr = self.config.http_addr();
        TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))
    }

    /// Bind and serve until [`ShutdownHandle::shutdown`] is called.
    pub async fn start(self) -> Result<(), GatewayError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(self, listener: TcpListener) -> Result<(), GatewayError> {
        let addr: Option<SocketAddr> = listener.local_addr().ok();
        let router = self.router();
        let root = self.root.clone();

        info!(addr = ?addr, "Starting HTTP server");
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { root.cancelled().await })
            .await
            .map_err(|e| GatewayError::Serve(e.to_string()))?;

        info!("API Gateway stopped");
        Ok(())
    }
}
