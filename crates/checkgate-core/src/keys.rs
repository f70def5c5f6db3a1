//! Startup key provisioning.
//!
//! Keys come from a JSON file, a single key given through the environment, or
//! both. They are decoded and validated once and then frozen into a
//! [`KeyStore`]. Nothing here ever formats secret bytes into an error.

use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use checkgate_auth::{KeyStore, SignatureAlgorithm};
use tracing::{info, warn};

use crate::config::CheckGateConfig;
use crate::error::{CheckGateError, CheckGateResult};

/// Length of an Ed25519 public key.
const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// One entry of the key provisioning file.
///
/// ```json
/// [{ "keyId": "integration", "algorithm": "hmac-sha256", "secret": "<base64>" }]
/// ```
#[derive(Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KeyEntry {
    /// The id clients present as `keyId`.
    pub key_id: String,
    /// Algorithm wire name.
    pub algorithm: String,
    /// Base64 key material: the shared secret for HMAC, the public key for
    /// Ed25519.
    pub secret: String,
}

impl fmt::Debug for KeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEntry")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl KeyEntry {
    fn decode(&self) -> CheckGateResult<(SignatureAlgorithm, Vec<u8>)> {
        let algorithm: SignatureAlgorithm = self.algorithm.parse().map_err(|_| {
            CheckGateError::KeyProvisioning(format!(
                "key {}: unsupported algorithm '{}'",
                self.key_id, self.algorithm
            ))
        })?;

        let secret = BASE64.decode(self.secret.trim()).map_err(|_| {
            CheckGateError::KeyProvisioning(format!(
                "key {}: secret is not valid base64",
                self.key_id
            ))
        })?;

        if algorithm == SignatureAlgorithm::Ed25519 && secret.len() != ED25519_PUBLIC_KEY_LEN {
            return Err(CheckGateError::KeyProvisioning(format!(
                "key {}: ed25519 public key must be {ED25519_PUBLIC_KEY_LEN} bytes",
                self.key_id
            )));
        }

        Ok((algorithm, secret))
    }
}

/// Parse the JSON key provisioning document.
///
/// # Errors
///
/// Returns [`CheckGateError::KeyProvisioning`] if the document is not a JSON
/// array of key entries.
pub fn parse_key_entries(json: &str) -> CheckGateResult<Vec<KeyEntry>> {
    serde_json::from_str(json)
        .map_err(|e| CheckGateError::KeyProvisioning(format!("invalid key file: {e}")))
}

fn read_key_file(path: &Path) -> CheckGateResult<Vec<KeyEntry>> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        CheckGateError::KeyProvisioning(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_key_entries(&json)
}

/// Build the immutable key store from the configured sources.
///
/// # Errors
///
/// Returns [`CheckGateError::KeyProvisioning`] on unreadable files, invalid
/// entries, or a `(keyId, algorithm)` pair registered twice.
pub fn load_key_store(config: &CheckGateConfig) -> CheckGateResult<KeyStore> {
    let mut entries = match &config.keys_file {
        Some(path) => read_key_file(path)?,
        None => Vec::new(),
    };

    if let (Some(key_id), Some(secret)) = (&config.key_id, &config.key_secret) {
        entries.push(KeyEntry {
            key_id: key_id.clone(),
            algorithm: config.key_algorithm.as_str().to_owned(),
            secret: secret.clone(),
        });
    }

    let mut builder = KeyStore::builder();
    for entry in &entries {
        let (algorithm, secret) = entry.decode()?;
        builder = builder.insert(entry.key_id.clone(), algorithm, secret);
    }
    let store = builder
        .build()
        .map_err(|e| CheckGateError::KeyProvisioning(e.to_string()))?;

    if store.is_empty() {
        warn!("no signing keys provisioned, every protected request will be denied");
    } else {
        for (key_id, algorithm) in store.key_ids() {
            info!(key_id, %algorithm, "provisioned signing key");
        }
    }

    Ok(store)
}
