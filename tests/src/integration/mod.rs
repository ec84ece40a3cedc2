//! Cross-crate flows over the in-process broker.

mod document_flows;
mod verification_rpc;
