//! Body digest validation.
//!
//! The `digest` header carries one or more `ALGORITHM=<base64>` entries:
//!
//! ```text
//! digest: SHA-256=X48E9qOokqqrvdts8nOJRJN3OWDUoyWxBf7kbu9DBPE=
//! ```
//!
//! Every supported entry must match the body. Unsupported entries are ignored,
//! but at least one supported entry must be present.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ::digest::Digest;
use sha2::{Sha256, Sha512};

use crate::algorithm::constant_time_eq;
use crate::error::AuthError;

/// Name of the body digest header.
pub const DIGEST_HEADER: &str = "digest";

/// Digest algorithms accepted in the `digest` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
}

impl DigestAlgorithm {
    /// The registered tag, as written in the header.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Look up a tag, case-insensitively.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        [Self::Sha256, Self::Sha512]
            .into_iter()
            .find(|alg| alg.as_str().eq_ignore_ascii_case(tag))
    }

    /// Hash `body` with this algorithm.
    #[must_use]
    pub fn hash(self, body: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => hash_with::<Sha256>(body),
            Self::Sha512 => hash_with::<Sha512>(body),
        }
    }
}

fn hash_with<D: Digest>(body: &[u8]) -> Vec<u8> {
    D::digest(body).to_vec()
}

/// Compute a `digest` header value for `body`.
///
/// # Examples
///
/// ```
/// use checkgate_auth::digest::{DigestAlgorithm, digest_header_value};
///
/// assert_eq!(
///     digest_header_value(DigestAlgorithm::Sha256, b""),
///     "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
/// );
/// ```
#[must_use]
pub fn digest_header_value(algorithm: DigestAlgorithm, body: &[u8]) -> String {
    format!("{}={}", algorithm.as_str(), BASE64.encode(algorithm.hash(body)))
}

/// Validate a `digest` header value against the raw body bytes.
///
/// # Errors
///
/// - [`AuthError::BodyTampered`] if any supported entry does not match or
///   cannot be decoded.
/// - [`AuthError::UnsupportedAlgorithm`] if no entry uses a supported algorithm.
/// - [`AuthError::MalformedSignature`] if an entry has no `=` separator.
pub fn validate_digest(header_value: &str, body: &[u8]) -> Result<(), AuthError> {
    let mut checked = 0usize;

    for entry in header_value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (tag, encoded) = entry
            .split_once('=')
            .ok_or_else(|| AuthError::malformed("digest entry without '='"))?;

        let Some(algorithm) = DigestAlgorithm::from_tag(tag.trim()) else {
            continue;
        };

        let expected = BASE64
            .decode(encoded.trim())
            .map_err(|_| AuthError::BodyTampered)?;
        if !constant_time_eq(&algorithm.hash(body), &expected) {
            return Err(AuthError::BodyTampered);
        }
        checked += 1;
    }

    if checked == 0 {
        return Err(AuthError::UnsupportedAlgorithm(format!(
            "no supported digest in {header_value:?}"
        )));
    }
    Ok(())
}
