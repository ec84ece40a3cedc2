//! Middleware for the gateway.
//!
//! Layer order: Request → Trace → Timeout → CORS → BodyLimit → Handler.
//! Handlers additionally hold a [`RequestContext`] that carries the route's
//! deadline into the document service.

pub mod cors;
pub mod request_context;

pub use cors::create_cors_layer;
pub use request_context::RequestContext;
