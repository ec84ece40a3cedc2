//! # Adapters Layer
//!
//! Implementations of the outbound ports.

pub mod bus;
pub mod storage;

pub use bus::{BusEventPublisher, RpcSignatureVerifier};
pub use storage::InMemoryDocumentRepository;
#[cfg(feature = "rocksdb")]
pub use storage::{RocksDbConfig, RocksDbDocumentRepository};
