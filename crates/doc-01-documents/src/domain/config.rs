//! Service configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default bound on the remote verification call.
pub const DEFAULT_VERIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// How `verify` decides whether to consult the remote verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationPolicy {
    /// Always ask the remote verifier.
    #[default]
    RemoteOnly,
    /// Require a recorded validation whose signature equals the supplied
    /// one, then ask the remote verifier.
    LocalThenRemote,
}

impl VerificationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationPolicy::RemoteOnly => "remote-only",
            VerificationPolicy::LocalThenRemote => "local-then-remote",
        }
    }
}

impl fmt::Display for VerificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationPolicy {
    type Err = ServiceConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote-only" | "remote_only" | "remote" => Ok(Self::RemoteOnly),
            "local-then-remote" | "local_then_remote" | "local" => Ok(Self::LocalThenRemote),
            other => Err(ServiceConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Service configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceConfigError {
    #[error("unknown verification policy: {0}")]
    UnknownPolicy(String),
    #[error("verification timeout cannot be 0")]
    ZeroVerificationTimeout,
}

/// Behaviour switches of [`DocumentService`](crate::service::DocumentService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub verification_policy: VerificationPolicy,
    /// Bound on a single remote verification call.
    pub verification_timeout: Duration,
    /// Write `validacion` onto the stored record after a successful remote
    /// verification.
    pub record_verified_signature: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            verification_policy: VerificationPolicy::default(),
            verification_timeout: DEFAULT_VERIFICATION_TIMEOUT,
            record_verified_signature: false,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ServiceConfigError> {
        if self.verification_timeout.is_zero() {
            return Err(ServiceConfigError::ZeroVerificationTimeout);
        }
        Ok(())
    }
}
