//! Configuration management for CheckGate.
//!
//! All configuration is driven by environment variables.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use checkgate_auth::{DigestPolicy, GateConfig, SignatureAlgorithm};

use crate::error::{CheckGateError, CheckGateResult};

/// Default limit on collected request bodies.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Freshness tolerances at or above this are refused: a two-minute-old
/// request must always be stale.
const MAX_CLOCK_SKEW_SECS: u64 = 120;

/// Global configuration for CheckGate.
#[derive(Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckGateConfig {
    /// Bind address for the gateway.
    pub gateway_listen: String,
    /// Log level, used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Accepted distance between the `date` header and server time, in seconds.
    pub clock_skew_secs: u64,
    /// Require a covered digest on every protected request, not only those
    /// with a body.
    pub digest_always: bool,
    /// Largest request body the server will collect.
    pub max_body_bytes: usize,
    /// JSON key provisioning file.
    pub keys_file: Option<PathBuf>,
    /// Single provisioned key id.
    pub key_id: Option<String>,
    /// Base64 secret for `key_id`.
    #[serde(skip_serializing)]
    pub key_secret: Option<String>,
    /// Algorithm for `key_id`.
    #[serde(serialize_with = "serialize_algorithm")]
    pub key_algorithm: SignatureAlgorithm,
}

impl fmt::Debug for CheckGateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckGateConfig")
            .field("gateway_listen", &self.gateway_listen)
            .field("log_level", &self.log_level)
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("digest_always", &self.digest_always)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("keys_file", &self.keys_file)
            .field("key_id", &self.key_id)
            .field("key_secret", &self.key_secret.as_ref().map(|_| "[REDACTED]"))
            .field("key_algorithm", &self.key_algorithm)
            .finish()
    }
}

impl Default for CheckGateConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            clock_skew_secs: 30,
            digest_always: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            keys_file: None,
            key_id: None,
            key_secret: None,
            key_algorithm: SignatureAlgorithm::HmacSha256,
        }
    }
}

impl CheckGateConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`CheckGateError::Config`] if a variable is set to an invalid
    /// value.
    pub fn from_env() -> CheckGateResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`CheckGateError::Config`] if a variable is set to an invalid
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CheckGateResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("CHECKGATE_CLOCK_SKEW_SECS") {
            config.clock_skew_secs = parse_number("CHECKGATE_CLOCK_SKEW_SECS", &v)?;
        }
        if let Some(v) = lookup("CHECKGATE_DIGEST_POLICY") {
            config.digest_always = match v.trim().to_ascii_lowercase().as_str() {
                "when-body-present" => false,
                "always" => true,
                other => {
                    return Err(CheckGateError::Config(format!(
                        "CHECKGATE_DIGEST_POLICY must be 'when-body-present' or 'always', got '{other}'"
                    )));
                }
            };
        }
        if let Some(v) = lookup("CHECKGATE_MAX_BODY_BYTES") {
            config.max_body_bytes = parse_number("CHECKGATE_MAX_BODY_BYTES", &v)?;
        }
        if let Some(v) = lookup("CHECKGATE_KEYS_FILE").filter(|v| !v.is_empty()) {
            config.keys_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("CHECKGATE_KEY_ID").filter(|v| !v.is_empty()) {
            config.key_id = Some(v);
        }
        if let Some(v) = lookup("CHECKGATE_KEY_SECRET").filter(|v| !v.is_empty()) {
            config.key_secret = Some(v);
        }
        if let Some(v) = lookup("CHECKGATE_KEY_ALGORITHM") {
            config.key_algorithm = v.parse().map_err(|_| {
                CheckGateError::Config(format!("CHECKGATE_KEY_ALGORITHM '{v}' is not supported"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`CheckGateError::Config`] describing the first violation.
    pub fn validate(&self) -> CheckGateResult<()> {
        if self.clock_skew_secs == 0 || self.clock_skew_secs >= MAX_CLOCK_SKEW_SECS {
            return Err(CheckGateError::Config(format!(
                "CHECKGATE_CLOCK_SKEW_SECS must be between 1 and {}, got {}",
                MAX_CLOCK_SKEW_SECS - 1,
                self.clock_skew_secs
            )));
        }
        if self.max_body_bytes == 0 {
            return Err(CheckGateError::Config(
                "CHECKGATE_MAX_BODY_BYTES must be greater than 0".to_owned(),
            ));
        }
        if self.key_id.is_some() != self.key_secret.is_some() {
            return Err(CheckGateError::Config(
                "CHECKGATE_KEY_ID and CHECKGATE_KEY_SECRET must be set together".to_owned(),
            ));
        }
        Ok(())
    }

    /// The authentication gate settings derived from this configuration.
    #[must_use]
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            clock_skew: Duration::from_secs(self.clock_skew_secs),
            digest_policy: if self.digest_always {
                DigestPolicy::Always
            } else {
                DigestPolicy::WhenBodyPresent
            },
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> CheckGateResult<T> {
    value.trim().parse().map_err(|_| {
        CheckGateError::Config(format!(
            "{name} must be a non-negative integer, got '{value}'"
        ))
    })
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_algorithm<S: serde::Serializer>(
    algorithm: &SignatureAlgorithm,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(algorithm.as_str())
}
