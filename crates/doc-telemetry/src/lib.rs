//! # Document Service Telemetry
//!
//! Installs the process-wide `tracing` subscriber:
//!
//! - an `EnvFilter` shared by every sink
//! - console output, JSON lines (containers, log shippers) or pretty
//! - optionally a rolling JSON log file
//! - optionally, with the `otlp` feature, span export to an OTLP collector
//!
//! ## Usage
//!
//! ```rust,ignore
//! use doc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DOC_SERVICE_NAME` | `document-service` | Service name in logs |
//! | `DOC_LOG_LEVEL` | `info` | Log filter directives |
//! | `DOC_LOG_JSON` | `false` (`true` in containers) | JSON console output |
//! | `DOC_LOG_DIR` | unset | Directory of the rolling JSON log file |
//! | `DOC_LOG_ROTATION` | `daily` | `daily`, `hourly` or `never` |
//! | `DOC_OTLP_ENDPOINT` | unset | OTLP/gRPC collector (feature `otlp`) |
//! | `RUST_LOG` | | Overrides `DOC_LOG_LEVEL` when set |

mod config;
#[cfg(feature = "otlp")]
mod otlp;

pub use config::{LogRotation, TelemetryConfig};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("cannot create log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start span exporter: {0}")]
    Exporter(String),

    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Build the level filter: `RUST_LOG` first, then the configured directives.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Filter(e.to_string()))
}

/// File name of the log file inside the log directory. Rotated files get a
/// date suffix.
pub fn log_file_name(config: &TelemetryConfig) -> String {
    format!("{}.log", config.service_name)
}

/// Install the global subscriber.
///
/// Returns a guard to hold for the lifetime of the application; dropping it
/// flushes the log file and the span exporter. Fails if a subscriber is
/// already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let (layers, guard) = build_layers(&config)?;

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| TelemetryError::Install(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json = config.json_logs,
        log_dir = ?config.log_dir,
        otlp_endpoint = ?config.otlp_endpoint,
        "Telemetry initialized"
    );
    #[cfg(not(feature = "otlp"))]
    if config.otlp_endpoint.is_some() {
        tracing::warn!("DOC_OTLP_ENDPOINT is set but span export needs the `otlp` feature");
    }

    Ok(guard)
}

/// Assemble every configured sink without installing anything.
fn build_layers(
    config: &TelemetryConfig,
) -> Result<(Vec<BoxedLayer>, TelemetryGuard), TelemetryError> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(config)];

    let file_guard = match &config.log_dir {
        Some(dir) => {
            let (layer, guard) = file_layer(config, dir)?;
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    #[cfg(feature = "otlp")]
    let provider = match &config.otlp_endpoint {
        Some(endpoint) => {
            let (layer, provider) = otlp::span_export_layer(&config.service_name, endpoint)?;
            layers.push(layer);
            Some(provider)
        }
        None => None,
    };
    layers.push(Box::new(build_filter(config)?));

    Ok((
        layers,
        TelemetryGuard {
            service_name: config.service_name.clone(),
            file_guard,
            #[cfg(feature = "otlp")]
            provider,
        },
    ))
}

fn console_layer(config: &TelemetryConfig) -> BoxedLayer {
    if config.json_logs {
        Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(config.ansi),
        )
    }
}

/// JSON lines into a rolling file, written off the calling thread.
fn file_layer(
    config: &TelemetryConfig,
    dir: &Path,
) -> Result<(BoxedLayer, WorkerGuard), TelemetryError> {
    std::fs::create_dir_all(dir).map_err(|source| TelemetryError::LogDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let rotation = match config.log_rotation {
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Never => Rotation::NEVER,
    };
    let appender = RollingFileAppender::new(rotation, dir, log_file_name(config));
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true);

    Ok((Box::new(layer), guard))
}

/// Keeps telemetry active for the process lifetime.
pub struct TelemetryGuard {
    service_name: String,
    file_guard: Option<WorkerGuard>,
    #[cfg(feature = "otlp")]
    provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

impl TelemetryGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn writes_file(&self) -> bool {
        self.file_guard.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
        #[cfg(feature = "otlp")]
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {e:?}");
            }
        }
    }
}
