//! # Document Service
//!
//! Entry point: configuration from `DOC_*` variables, logging from
//! `DOC_LOG_*`, then serve until Ctrl-C.

use anyhow::{Context, Result};
use doc_runtime::{DocumentRuntime, RuntimeConfig};
use doc_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;

    let runtime = DocumentRuntime::new(config).await?;
    info!(addr = %runtime.local_addr()?, "Document service starting");

    let shutdown = runtime.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
        }
        shutdown.shutdown();
    });

    runtime.run().await
}
