//! Key resolution.
//!
//! [`KeyResolver`] is the seam between the verification pipeline and wherever
//! key material lives. [`KeyStore`] is the in-memory implementation used by the
//! server: it is built once at startup and is read-only afterwards, so it can
//! be shared across every request task behind an `Arc` without locking.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use crate::algorithm::SignatureAlgorithm;
use crate::error::AuthError;

/// Opaque secret key bytes.
///
/// `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(Arc<[u8]>);

impl KeyMaterial {
    /// Wrap raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    /// Borrow the raw key bytes for a cryptographic operation.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Length of the key in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([REDACTED; {} bytes])", self.0.len())
    }
}

/// A registered key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    /// The identifier clients present as `keyId`.
    pub key_id: String,
    /// The only algorithm this key may be used with.
    pub algorithm: SignatureAlgorithm,
    /// The key material.
    pub secret: KeyMaterial,
}

/// Trait for looking up key material by `(keyId, algorithm)`.
///
/// `Ok(None)` means the pair is not registered. `Err` means the backing store
/// could not answer; the gate denies the request in that case.
pub trait KeyResolver: Send + Sync {
    /// Resolve the key for the exact `(key_id, algorithm)` pair.
    fn resolve(
        &self,
        key_id: &str,
        algorithm: SignatureAlgorithm,
    ) -> Result<Option<KeyRecord>, AuthError>;
}

/// Immutable in-memory key store.
///
/// # Examples
///
/// ```
/// use checkgate_auth::{KeyStore, SignatureAlgorithm};
///
/// let store = KeyStore::builder()
///     .insert("integration", SignatureAlgorithm::HmacSha256, b"secret".to_vec())
///     .build()
///     .unwrap();
///
/// assert!(store.get("integration", SignatureAlgorithm::HmacSha256).is_some());
/// assert!(store.get("integration", SignatureAlgorithm::HmacSha512).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    keys: HashMap<(String, SignatureAlgorithm), KeyRecord>,
}

impl KeyStore {
    /// Start building a key store.
    #[must_use]
    pub fn builder() -> KeyStoreBuilder {
        KeyStoreBuilder::default()
    }

    /// Look up a key. Never fails.
    #[must_use]
    pub fn get(&self, key_id: &str, algorithm: SignatureAlgorithm) -> Option<&KeyRecord> {
        self.keys.get(&(key_id.to_owned(), algorithm))
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Registered `(keyId, algorithm)` pairs, sorted.
    #[must_use]
    pub fn key_ids(&self) -> Vec<(&str, SignatureAlgorithm)> {
        let mut ids: Vec<_> = self
            .keys
            .keys()
            .map(|(id, alg)| (id.as_str(), *alg))
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl KeyResolver for KeyStore {
    fn resolve(
        &self,
        key_id: &str,
        algorithm: SignatureAlgorithm,
    ) -> Result<Option<KeyRecord>, AuthError> {
        Ok(self.get(key_id, algorithm).cloned())
    }
}

/// Builder for [`KeyStore`]. Duplicate pairs are reported at [`build`](Self::build).
#[derive(Debug, Default)]
pub struct KeyStoreBuilder {
    records: Vec<KeyRecord>,
}

impl KeyStoreBuilder {
    /// Register a key.
    #[must_use]
    pub fn insert(
        mut self,
        key_id: impl Into<String>,
        algorithm: SignatureAlgorithm,
        secret: impl Into<Vec<u8>>,
    ) -> Self {
        self.records.push(KeyRecord {
            key_id: key_id.into(),
            algorithm,
            secret: KeyMaterial::new(secret),
        });
        self
    }

    /// Finish building.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError`] if a `(keyId, algorithm)` pair is registered
    /// twice, a key id is empty, or a key has no material.
    pub fn build(self) -> Result<KeyStore, KeyStoreError> {
        let mut keys = HashMap::with_capacity(self.records.len());
        for record in self.records {
            if record.key_id.is_empty() {
                return Err(KeyStoreError::EmptyKeyId);
            }
            if record.secret.is_empty() {
                return Err(KeyStoreError::EmptySecret(record.key_id));
            }
            match keys.entry((record.key_id.clone(), record.algorithm)) {
                Entry::Occupied(_) => {
                    return Err(KeyStoreError::Duplicate {
                        key_id: record.key_id,
                        algorithm: record.algorithm,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
            }
        }
        Ok(KeyStore { keys })
    }
}

/// Errors raised while building a [`KeyStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyStoreError {
    /// The same pair was registered twice.
    #[error("duplicate key registration: {key_id} ({algorithm})")]
    Duplicate {
        /// The repeated key id.
        key_id: String,
        /// The repeated algorithm.
        algorithm: SignatureAlgorithm,
    },

    /// A key was registered with an empty id.
    #[error("key id must not be empty")]
    EmptyKeyId,

    /// A key was registered with no material.
    #[error("key {0} has empty key material")]
    EmptySecret(String),
}
