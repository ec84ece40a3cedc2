//! Storage adapters for [`DocumentRepository`](crate::ports::DocumentRepository).

mod memory;
#[cfg(feature = "rocksdb")]
mod rocksdb_store;

pub use memory::InMemoryDocumentRepository;
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::{RocksDbConfig, RocksDbDocumentRepository};
