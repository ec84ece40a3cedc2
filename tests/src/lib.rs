//! # Document Service Test Suite
//!
//! Unified test crate.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support/          # Wired service stack and a fake remote verifier
//! ├── integration/      # Service + broker adapters + gateway
//! │   ├── document_flows.rs
//! │   └── verification_rpc.rs
//! └── properties/       # proptest suites for pure domain rules
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p doc-tests
//!
//! # By category
//! cargo test -p doc-tests integration::
//! cargo test -p doc-tests properties::
//! ```

pub mod integration;
pub mod properties;
pub mod support;
