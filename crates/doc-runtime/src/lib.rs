//! # Document Service Runtime
//!
//! Process wiring for the document service.
//!
//! ## Modular Structure
//!
//! - `container/` - configuration and component construction
//!
//! ## Startup Sequence
//!
//! 1. Load and validate configuration from the environment
//! 2. Install the tracing subscriber
//! 3. Connect to the broker and declare the topology
//! 4. Open the document store
//! 5. Bind the HTTP listener and serve
//!
//! ## Shutdown
//!
//! Ctrl-C stops accepting connections, cancels every in-flight request's
//! context, waits for handlers to return, then closes the broker connection.

pub mod container;

use anyhow::{Context, Result};
use doc_02_api_gateway::{ApiGatewayService, ShutdownHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

pub use container::{ConfigError, RuntimeConfig, ServiceContainer};

/// A wired document service with its HTTP listener bound.
pub struct DocumentRuntime {
    container: ServiceContainer,
    gateway: ApiGatewayService,
    listener: TcpListener,
}

impl DocumentRuntime {
    /// Build every component and bind the HTTP port.
    pub async fn new(config: RuntimeConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let container = ServiceContainer::build(&config).await?;
        let gateway = ApiGatewayService::new(config.gateway.clone(), container.api())
            .context("Failed to create API gateway")?;
        let listener = gateway.bind().await.context("Failed to bind HTTP listener")?;

        Ok(Self {
            container,
            gateway,
            listener,
        })
    }

    /// The bound HTTP address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Listener has no local address")
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.gateway.shutdown_handle()
    }

    /// Serve until the shutdown handle fires, then release the broker.
    pub async fn run(self) -> Result<()> {
        let Self {
            container,
            gateway,
            listener,
        } = self;

        info!(addr = ?listener.local_addr().ok(), "Document service listening");
        let served = gateway.serve(listener).await;

        container.close().await;
        info!("Shutdown complete");
        served.context("HTTP server failed")
    }
}
