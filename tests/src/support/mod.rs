//! Shared fixtures for the integration tests.

pub mod fake_verifier;

pub use fake_verifier::{Behaviour, FakeVerifier};

use doc_01_documents::test_utils::FixedClock;
use doc_01_documents::{
    BusEventPublisher, DocumentService, InMemoryDocumentRepository, RpcSignatureVerifier,
    ServiceConfig,
};
use shared_bus::topology::VERIFY_REQUEST_QUEUE;
use shared_bus::{BrokerEventPublisher, ConnectionManager, InMemoryBroker, RpcClient};
use std::sync::Arc;

/// The document service wired to real broker adapters over an in-process
/// broker.
pub struct TestStack {
    pub broker: InMemoryBroker,
    pub connection: ConnectionManager,
    pub repository: Arc<InMemoryDocumentRepository>,
    pub verifier: Arc<RpcSignatureVerifier>,
    pub service: Arc<DocumentService>,
}

impl TestStack {
    pub async fn new() -> Self {
        Self::with_config(ServiceConfig::default()).await
    }

    pub async fn with_config(config: ServiceConfig) -> Self {
        let broker = InMemoryBroker::new();
        let connection = ConnectionManager::connect(Arc::new(broker.clone()))
            .await
            .expect("connect to in-memory broker");

        let repository = Arc::new(InMemoryDocumentRepository::new());
        let events = Arc::new(BusEventPublisher::new(Arc::new(BrokerEventPublisher::new(
            connection.clone(),
        ))));
        let verifier = Arc::new(RpcSignatureVerifier::new(
            RpcClient::new(connection.clone(), VERIFY_REQUEST_QUEUE),
            config.verification_timeout,
        ));
        let service = Arc::new(
            DocumentService::new(repository.clone(), events, verifier.clone(), config)
                .with_clock(Arc::new(FixedClock::default())),
        );

        Self {
            broker,
            connection,
            repository,
            verifier,
            service,
        }
    }
}
