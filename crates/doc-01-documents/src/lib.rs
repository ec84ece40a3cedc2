//! # Document Service (DOC-01)
//!
//! Lifecycle orchestration for fiscal documents: validate, persist, notify,
//! and verify signatures through a remote verifier reached over the broker.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): validator and configuration, no I/O
//! - **Ports Layer** (`ports/`): `DocumentApi` inbound; repository, event,
//!   verifier and clock outbound
//! - **Adapters Layer** (`adapters/`): in-memory and RocksDB stores, broker
//!   publisher and RPC verifier
//! - **Service Layer** (`service.rs`): wires domain logic to ports
//!
//! ## Failure Taxonomy
//!
//! | Error | When |
//! |-------|------|
//! | Validation | candidate malformed, or unvalidated under `local-then-remote` |
//! | NotFound | referenced `documentId` absent |
//! | Conflict | `documentId` already taken |
//! | Internal | store, broker or verifier failure, deadline exceeded |
//! | Cancelled | caller abandoned the operation |

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export public API
pub use adapters::{BusEventPublisher, InMemoryDocumentRepository, RpcSignatureVerifier};
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbDocumentRepository};
pub use domain::{ServiceConfig, ServiceConfigError, VerificationPolicy};
pub use ports::inbound::DocumentApi;
pub use ports::outbound::{
    DocumentEventPublisher, DocumentRepository, EventError, RepositoryError, SignatureVerifier,
    SystemTimeSource, TimeSource, VerifierError,
};
pub use service::DocumentService;
