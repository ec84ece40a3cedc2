//! # Ports Layer
//!
//! - `inbound`: the API this crate offers to the HTTP front end.
//! - `outbound`: what the service needs from storage, the broker and the
//!   clock.

pub mod inbound;
pub mod outbound;

pub use inbound::DocumentApi;
pub use outbound::{
    DocumentEventPublisher, DocumentRepository, EventError, RepositoryError, SignatureVerifier,
    SystemTimeSource, TimeSource, VerifierError,
};
