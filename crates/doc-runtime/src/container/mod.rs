//! # Service Container
//!
//! Builds the long-lived components from a [`RuntimeConfig`] and hands them
//! out as `Arc` handles. Nothing here is global: the binary owns exactly one
//! container.
//!
//! Construction order:
//! 1. Broker connection (topology declared on connect)
//! 2. Document store
//! 3. Event publisher and RPC verifier over the shared connection
//! 4. Document service

pub mod config;

pub use config::{BrokerConfig, ConfigError, RuntimeConfig, StorageConfig};

use anyhow::{Context, Result};
use doc_01_documents::{
    BusEventPublisher, DocumentApi, DocumentRepository, DocumentService,
    InMemoryDocumentRepository, RpcSignatureVerifier,
};
use shared_bus::topology::VERIFY_REQUEST_QUEUE;
use shared_bus::{BrokerEventPublisher, ConnectionManager, InMemoryBroker, RpcClient};
use std::sync::Arc;
use tracing::{info, warn};

/// Long-lived components of a running document service.
pub struct ServiceContainer {
    pub connection: ConnectionManager,
    pub repository: Arc<dyn DocumentRepository>,
    pub service: Arc<DocumentService>,
}

impl ServiceContainer {
    /// Connect to the broker, open the store and wire the service.
    pub async fn build(config: &RuntimeConfig) -> Result<Self> {
        let connection = connect_broker(&config.broker).await?;
        let repository = open_store(&config.storage)?;

        let events = Arc::new(BusEventPublisher::new(Arc::new(BrokerEventPublisher::new(
            connection.clone(),
        ))));
        let verifier = Arc::new(RpcSignatureVerifier::new(
            RpcClient::new(connection.clone(), VERIFY_REQUEST_QUEUE),
            config.service.verification_timeout,
        ));

        let service = Arc::new(DocumentService::new(
            Arc::clone(&repository),
            events,
            verifier,
            config.service.clone(),
        ));
        info!(
            policy = %config.service.verification_policy,
            verification_timeout_ms = config.service.verification_timeout.as_millis() as u64,
            record_verified_signature = config.service.record_verified_signature,
            "Document service ready"
        );

        Ok(Self {
            connection,
            repository,
            service,
        })
    }

    /// The service as the gateway sees it.
    pub fn api(&self) -> Arc<dyn DocumentApi> {
        self.service.clone()
    }

    /// Close the broker connection. Safe to call more than once.
    pub async fn close(&self) {
        if let Err(e) = self.connection.close().await {
            warn!(error = %e, "Broker connection did not close cleanly");
        }
    }
}

async fn connect_broker(config: &BrokerConfig) -> Result<ConnectionManager> {
    match &config.amqp_uri {
        #[cfg(feature = "amqp")]
        Some(uri) => {
            let connection = ConnectionManager::connect_amqp(uri)
                .await
                .context("Failed to connect to AMQP broker")?;
            info!("Using AMQP broker");
            Ok(connection)
        }
        #[cfg(not(feature = "amqp"))]
        Some(_) => anyhow::bail!("DOC_AMQP_URI is set but this build lacks the `amqp` feature"),
        None => {
            warn!("DOC_AMQP_URI not set, using in-process broker; verification needs a verifier in this process");
            ConnectionManager::connect(Arc::new(InMemoryBroker::new()))
                .await
                .context("Failed to declare broker topology")
        }
    }
}

fn open_store(config: &StorageConfig) -> Result<Arc<dyn DocumentRepository>> {
    match &config.path {
        #[cfg(feature = "rocksdb")]
        Some(path) => {
            use doc_01_documents::{RocksDbConfig, RocksDbDocumentRepository};

            let store = RocksDbDocumentRepository::open(RocksDbConfig {
                path: path.to_string_lossy().into_owned(),
                ..RocksDbConfig::default()
            })
            .with_context(|| format!("Failed to open document store at {}", path.display()))?;
            info!(path = %path.display(), "Using RocksDB document store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "rocksdb"))]
        Some(_) => anyhow::bail!("DOC_STORE_PATH is set but this build lacks the `rocksdb` feature"),
        None => {
            info!("DOC_STORE_PATH not set, using in-memory document store");
            Ok(Arc::new(InMemoryDocumentRepository::new()))
        }
    }
}
