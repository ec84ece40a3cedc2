//! # Domain Layer
//!
//! Pure document rules and service configuration. No I/O.

pub mod config;
pub mod validator;

pub use config::{ServiceConfig, ServiceConfigError, VerificationPolicy};
pub use validator::{apply_defaults, validate};
