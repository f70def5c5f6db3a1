//! Signature algorithm registry.
//!
//! The set of accepted algorithms is closed: [`SignatureAlgorithm`] names every
//! tag the server understands, and [`verifier_for`] maps each tag to the routine
//! that checks it. Adding an algorithm means one new variant and one new arm.
//!
//! | Tag           | Primitive                     | Key material            |
//! |---------------|-------------------------------|-------------------------|
//! | `hmac-sha256` | HMAC-SHA256                   | shared secret           |
//! | `hmac-sha512` | HMAC-SHA512                   | shared secret           |
//! | `ed25519`     | Ed25519 (strict verification) | 32-byte public key      |

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature, VerifyingKey};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// A signature algorithm accepted in the `algorithm` signature parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignatureAlgorithm {
    /// HMAC with SHA-256.
    HmacSha256,
    /// HMAC with SHA-512.
    HmacSha512,
    /// Ed25519 over the canonical string.
    Ed25519,
}

impl SignatureAlgorithm {
    /// Every registered algorithm.
    pub const ALL: [Self; 3] = [Self::HmacSha256, Self::HmacSha512, Self::Ed25519];

    /// The wire name of the algorithm.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha512 => "hmac-sha512",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AuthError::UnsupportedAlgorithm(s.to_owned()))
    }
}

/// A verification routine for one algorithm.
pub trait SignatureVerifier: Send + Sync {
    /// Check `signature` over `message` with the given key material.
    ///
    /// Returns `false` for any failure, including key material of the wrong
    /// shape. Never panics.
    fn verify(&self, key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

/// HMAC-SHA256 verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha256Verifier;

/// HMAC-SHA512 verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha512Verifier;

/// Ed25519 verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for HmacSha256Verifier {
    fn verify(&self, key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        hmac_sha256(key, message).is_some_and(|expected| constant_time_eq(&expected, signature))
    }
}

impl SignatureVerifier for HmacSha512Verifier {
    fn verify(&self, key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        hmac_sha512(key, message).is_some_and(|expected| constant_time_eq(&expected, signature))
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let Ok(key_bytes) = <[u8; 32]>::try_from(key) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify_strict(message, &signature).is_ok()
    }
}

/// Look up the verification routine for an algorithm.
#[must_use]
pub fn verifier_for(algorithm: SignatureAlgorithm) -> &'static dyn SignatureVerifier {
    match algorithm {
        SignatureAlgorithm::HmacSha256 => &HmacSha256Verifier,
        SignatureAlgorithm::HmacSha512 => &HmacSha512Verifier,
        SignatureAlgorithm::Ed25519 => &Ed25519Verifier,
    }
}

/// Verify `signature` over `message` using the registered routine for `algorithm`.
///
/// # Errors
///
/// Returns [`AuthError::BadSignature`] if the signature does not verify.
pub fn verify_signature(
    algorithm: SignatureAlgorithm,
    key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), AuthError> {
    if verifier_for(algorithm).verify(key, message, signature) {
        Ok(())
    } else {
        Err(AuthError::BadSignature)
    }
}

/// Compute an HMAC tag for a MAC algorithm.
///
/// Returns `None` for non-MAC algorithms.
#[must_use]
pub fn compute_mac(algorithm: SignatureAlgorithm, key: &[u8], message: &[u8]) -> Option<Vec<u8>> {
    match algorithm {
        SignatureAlgorithm::HmacSha256 => hmac_sha256(key, message),
        SignatureAlgorithm::HmacSha512 => hmac_sha512(key, message),
        SignatureAlgorithm::Ed25519 => None,
    }
}

/// Constant-time byte comparison. Length differences are not secret.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(data);
    Some(mac.finalize().into_bytes().to_vec())
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha512::new_from_slice(key).ok()?;
    mac.update(data);
    Some(mac.finalize().into_bytes().to_vec())
}
