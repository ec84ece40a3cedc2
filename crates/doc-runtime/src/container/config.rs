//! # Runtime Configuration
//!
//! Unified configuration for the gateway, the document service, the broker
//! and the store, loaded from `DOC_*` environment variables on top of
//! defaults.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `DOC_HTTP_HOST` | `0.0.0.0` | HTTP bind address |
//! | `DOC_HTTP_PORT` | `3500` | HTTP port |
//! | `DOC_AMQP_URI` | unset (in-process broker) | RabbitMQ URI |
//! | `DOC_STORE_PATH` | unset (in-memory store) | RocksDB directory |
//! | `DOC_VERIFY_POLICY` | `remote-only` | or `local-then-remote` |
//! | `DOC_VERIFY_TIMEOUT_MS` | `10000` | verifier round trip |
//! | `DOC_RECORD_VERIFIED_SIGNATURE` | `false` | record successful verifications |
//! | `DOC_DEFAULT_TIMEOUT_MS` | `5000` | create/list/get/delete deadline |
//! | `DOC_UPDATE_TIMEOUT_MS` | `7000` | update deadline |

use doc_01_documents::{ServiceConfig, ServiceConfigError, VerificationPolicy};
use doc_02_api_gateway::GatewayConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Headroom between the verifier round trip and the verify route deadline,
/// which also covers the document lookup.
pub const VERIFY_ROUTE_HEADROOM: Duration = Duration::from_secs(2);

/// Headroom between the longest route deadline and the HTTP hard timeout.
pub const REQUEST_HEADROOM: Duration = Duration::from_secs(3);

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// HTTP front end.
    pub gateway: GatewayConfig,
    /// Document service switches.
    pub service: ServiceConfig,
    /// Broker selection.
    pub broker: BrokerConfig,
    /// Store selection.
    pub storage: StorageConfig,
}

/// Broker configuration.
#[derive(Debug, Clone, Default)]
pub struct BrokerConfig {
    /// RabbitMQ URI; `None` selects the in-process broker.
    pub amqp_uri: Option<String>,
}

/// Storage configuration.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// RocksDB directory; `None` selects the in-memory store.
    pub path: Option<PathBuf>,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("{var} is set but this build lacks the `{feature}` feature")]
    FeatureDisabled {
        var: &'static str,
        feature: &'static str,
    },

    #[error("service: {0}")]
    Service(#[from] ServiceConfigError),

    #[error("gateway: {0}")]
    Gateway(#[from] doc_02_api_gateway::ConfigError),
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { var, value })
}

fn parse_millis(var: &'static str, value: String) -> Result<Duration, ConfigError> {
    parse::<u64>(var, value).map(Duration::from_millis)
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue { var, value }),
    }
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup("DOC_HTTP_HOST") {
            config.gateway.http.host = parse("DOC_HTTP_HOST", v)?;
        }
        if let Some(v) = lookup("DOC_HTTP_PORT") {
            config.gateway.http.port = parse("DOC_HTTP_PORT", v)?;
        }

        config.broker.amqp_uri = lookup("DOC_AMQP_URI").filter(|v| !v.trim().is_empty());
        config.storage.path = lookup("DOC_STORE_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        if let Some(v) = lookup("DOC_VERIFY_POLICY") {
            config.service.verification_policy = v
                .parse::<VerificationPolicy>()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "DOC_VERIFY_POLICY",
                    value: v,
                })?;
        }
        if let Some(v) = lookup("DOC_VERIFY_TIMEOUT_MS") {
            config.service.verification_timeout = parse_millis("DOC_VERIFY_TIMEOUT_MS", v)?;
        }
        if let Some(v) = lookup("DOC_RECORD_VERIFIED_SIGNATURE") {
            config.service.record_verified_signature =
                parse_bool("DOC_RECORD_VERIFIED_SIGNATURE", v)?;
        }

        let timeouts = &mut config.gateway.timeouts;
        if let Some(v) = lookup("DOC_DEFAULT_TIMEOUT_MS") {
            timeouts.default = parse_millis("DOC_DEFAULT_TIMEOUT_MS", v)?;
        }
        if let Some(v) = lookup("DOC_UPDATE_TIMEOUT_MS") {
            timeouts.update = parse_millis("DOC_UPDATE_TIMEOUT_MS", v)?;
        }

        // Derived deadlines follow the verifier timeout and the longest route.
        timeouts.verify = timeouts
            .verify
            .max(config.service.verification_timeout + VERIFY_ROUTE_HEADROOM);
        let longest = timeouts.default.max(timeouts.update).max(timeouts.verify);
        timeouts.request = timeouts.request.max(longest + REQUEST_HEADROOM);

        Ok(config)
    }

    /// Validate every section, including backends missing from this build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        self.gateway.validate()?;

        if self.broker.amqp_uri.is_some() && !cfg!(feature = "amqp") {
            return Err(ConfigError::FeatureDisabled {
                var: "DOC_AMQP_URI",
                feature: "amqp",
            });
        }
        if self.storage.path.is_some() && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::FeatureDisabled {
                var: "DOC_STORE_PATH",
                feature: "rocksdb",
            });
        }
        Ok(())
    }
}
