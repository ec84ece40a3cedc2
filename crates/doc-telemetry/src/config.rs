//! Telemetry configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_SERVICE_NAME: &str = "document-service";
const DEFAULT_LOG_LEVEL: &str = "info";

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            other => Err(format!("unknown log rotation: {other}")),
        }
    }
}

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error, or directives)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to colour pretty output
    pub ansi: bool,

    /// Directory for the JSON log file; no file sink when unset
    pub log_dir: Option<PathBuf>,

    /// Rollover period of the log file
    pub log_rotation: LogRotation,

    /// OTLP collector endpoint; spans are exported only with the `otlp`
    /// feature
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
            ansi: true,
            log_dir: None,
            log_rotation: LogRotation::default(),
            otlp_endpoint: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DOC_SERVICE_NAME`: Service name (default: document-service)
    /// - `DOC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `DOC_LOG_JSON`: Enable JSON logs (default: false in dev, true in containers)
    /// - `NO_COLOR`: Disable ANSI colours
    /// - `DOC_LOG_DIR`: Also write JSON lines to a rolling file in this
    ///   directory
    /// - `DOC_LOG_ROTATION`: `daily` (default), `hourly` or `never`; unknown
    ///   values fall back to daily
    /// - `DOC_OTLP_ENDPOINT`: OTLP/gRPC collector for spans
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("DOC_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),

            log_level: lookup("DOC_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),

            json_logs: lookup("DOC_LOG_JSON")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(is_container),

            ansi: lookup("NO_COLOR").is_none(),

            log_dir: lookup("DOC_LOG_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),

            log_rotation: lookup("DOC_LOG_ROTATION")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),

            otlp_endpoint: lookup("DOC_OTLP_ENDPOINT").filter(|v| !v.trim().is_empty()),
        }
    }
}
