//! DOC-02 API Gateway - HTTP front end for the document service.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   API GATEWAY (doc-02)                   │
//! ├──────────────────────────────────────────────────────────┤
//! │  HTTP :3500                                              │
//! │      │                                                   │
//! │  ┌───┴───────────────────────────────────────────┐       │
//! │  │ Trace → CORS → Timeout → CatchPanic → Limit   │       │
//! │  └───┬───────────────────────────────────────────┘       │
//! │      │                                                   │
//! │  ┌───┴───────────────────────────────────────────┐       │
//! │  │ Handlers: RequestContext (deadline + cancel)   │       │
//! │  └───┬───────────────────────────────────────────┘       │
//! └──────┼───────────────────────────────────────────────────┘
//!        ▼
//!   DocumentApi (doc-01)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use doc_02_api_gateway::{ApiGatewayService, GatewayConfig};
//!
//! let service = ApiGatewayService::new(GatewayConfig::default(), api)?;
//! let shutdown = service.shutdown_handle();
//! tokio::spawn(service.start());
//! // ...
//! shutdown.shutdown();
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;

// Re-exports for public API
pub use domain::config::{
    ConfigError, CorsConfig, GatewayConfig, HttpConfig, LimitsConfig, TimeoutConfig,
};
pub use domain::error::{ApiError, ApiResult, ErrorBody, GatewayError};
pub use handlers::AppState;
pub use router::build_router;
pub use service::{ApiGatewayService, ShutdownHandle};
