//! # Shared Types Crate
//!
//! This crate contains the document entities, the payloads exchanged over the
//! message broker, the error taxonomy and the operation context used by every
//! other crate in the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Wire Compatibility**: Field names match the JSON documents stored and
//!   exchanged with the remote verifier (camelCase, Spanish business terms).
//! - **Typed Outcomes**: Transport failures never cross a crate boundary raw;
//!   they are folded into [`DocumentError`] by the orchestration layer.

pub mod context;
pub mod entities;
pub mod errors;
pub mod ipc;

pub use context::{CancelHandle, ContextError, OperationContext};
pub use entities::*;
pub use errors::*;
pub use ipc::*;
