//! Client-side request signing.
//!
//! [`RequestSigner`] produces the headers a client must send: it fills in
//! `date` and `digest` when they are missing, builds the signing string with
//! the same canonicalizer the gate uses, and writes an
//! `Authorization: Signature ...` header. Headers that are already set are
//! left alone, so callers can sign deliberately stale or mismatched requests.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use ed25519_dalek::Signer;
use http::HeaderValue;

use crate::algorithm::{SignatureAlgorithm, compute_mac};
use crate::canonical::{REQUEST_TARGET, build_signing_string};
use crate::digest::{DIGEST_HEADER, DigestAlgorithm, digest_header_value};
use crate::error::AuthError;
use crate::freshness::{DATE_HEADER, format_http_date};
use crate::params::SIGNATURE_SCHEME;

/// Private key material held by a signer.
#[derive(Clone)]
pub enum SigningKey {
    /// A shared secret for an HMAC algorithm.
    Hmac {
        /// The MAC algorithm.
        algorithm: SignatureAlgorithm,
        /// The shared secret.
        secret: Vec<u8>,
    },
    /// An Ed25519 private key.
    Ed25519(ed25519_dalek::SigningKey),
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// A shared-secret key for `algorithm`.
    pub fn hmac(algorithm: SignatureAlgorithm, secret: impl Into<Vec<u8>>) -> Self {
        Self::Hmac {
            algorithm,
            secret: secret.into(),
        }
    }

    /// An Ed25519 key.
    #[must_use]
    pub fn ed25519(key: ed25519_dalek::SigningKey) -> Self {
        Self::Ed25519(key)
    }

    /// The algorithm this key signs with.
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Hmac { algorithm, .. } => *algorithm,
            Self::Ed25519(_) => SignatureAlgorithm::Ed25519,
        }
    }

    /// Sign `message`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnsupportedAlgorithm`] if an HMAC key was built
    /// with a non-MAC algorithm.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AuthError> {
        match self {
            Self::Hmac { algorithm, secret } => compute_mac(*algorithm, secret, message)
                .ok_or_else(|| {
                    AuthError::UnsupportedAlgorithm(format!("{algorithm} is not a MAC algorithm"))
                }),
            Self::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec()),
        }
    }
}

/// Signs outgoing requests for one key.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    key_id: String,
    key: SigningKey,
    headers: Option<Vec<String>>,
}

impl RequestSigner {
    /// Create a signer that covers `(request-target)`, `date`, and `digest`
    /// when a digest is present.
    pub fn new(key_id: impl Into<String>, key: SigningKey) -> Self {
        Self {
            key_id: key_id.into(),
            key,
            headers: None,
        }
    }

    /// Cover exactly `headers`, in this order.
    #[must_use]
    pub fn with_headers(mut self, headers: &[&str]) -> Self {
        self.headers = Some(headers.iter().map(|h| h.to_ascii_lowercase()).collect());
        self
    }

    /// Sign a request described by its method, target and headers.
    ///
    /// Sets `date` to `now` and `digest` to the SHA-256 of a non-empty `body`
    /// unless those headers are already present, then inserts the
    /// `authorization` header.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if a covered header is missing or the key
    /// cannot sign.
    pub fn sign(
        &self,
        method: &http::Method,
        uri: &http::Uri,
        headers: &mut http::HeaderMap,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if !headers.contains_key(DATE_HEADER) {
            headers.insert(DATE_HEADER, header_value(format_http_date(now))?);
        }
        if !body.is_empty() && !headers.contains_key(DIGEST_HEADER) {
            headers.insert(
                DIGEST_HEADER,
                header_value(digest_header_value(DigestAlgorithm::Sha256, body))?,
            );
        }

        let covered = self.headers.clone().unwrap_or_else(|| {
            let mut covered = vec![REQUEST_TARGET.to_owned(), DATE_HEADER.to_owned()];
            if headers.contains_key(DIGEST_HEADER) {
                covered.push(DIGEST_HEADER.to_owned());
            }
            covered
        });

        let signing_string = build_signing_string(method, uri, headers, &covered)?;
        let signature = self.key.sign(&signing_string)?;

        let authorization = format!(
            r#"{SIGNATURE_SCHEME} keyId="{}",algorithm="{}",headers="{}",signature="{}""#,
            self.key_id,
            self.key.algorithm(),
            covered.join(" "),
            BASE64.encode(signature),
        );
        headers.insert(http::header::AUTHORIZATION, header_value(authorization)?);
        Ok(())
    }

    /// Sign request parts in place.
    ///
    /// # Errors
    ///
    /// See [`RequestSigner::sign`].
    pub fn sign_parts(
        &self,
        parts: &mut http::request::Parts,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.sign(&parts.method, &parts.uri, &mut parts.headers, body, now)
    }
}

fn header_value(value: String) -> Result<HeaderValue, AuthError> {
    HeaderValue::try_from(value)
        .map_err(|_| AuthError::Internal("generated header value is not valid".to_owned()))
}
