//! Signature credential parsing.
//!
//! The credential is a comma-separated list of `key="value"` pairs:
//!
//! ```text
//! keyId="integration",algorithm="hmac-sha256",headers="(request-target) date digest",signature="<base64>"
//! ```
//!
//! It is carried either as `Authorization: Signature <params>` or as a bare
//! `Signature: <params>` header. `keyId`, `algorithm` and `signature` are
//! required. `headers` is optional on the wire, but an absent list leaves the
//! coverage empty and the gate rejects it: the server never assumes a default.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::algorithm::SignatureAlgorithm;
use crate::error::AuthError;

/// Authorization scheme that introduces signature parameters.
pub const SIGNATURE_SCHEME: &str = "Signature";

/// Name of the standalone signature header.
pub const SIGNATURE_HEADER: &str = "signature";

/// Parsed signature parameters for one request.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureParameters {
    /// The presented key id.
    pub key_id: String,
    /// The presented algorithm.
    pub algorithm: SignatureAlgorithm,
    /// Covered header names, lowercased, in the order the client listed them.
    pub covered_headers: Vec<String>,
    /// The decoded signature bytes.
    pub signature: Vec<u8>,
}

impl SignatureParameters {
    /// Whether `name` appears in the covered header list (case-insensitive).
    #[must_use]
    pub fn covers(&self, name: &str) -> bool {
        self.covered_headers
            .iter()
            .any(|covered| covered.eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for SignatureParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureParameters")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("covered_headers", &self.covered_headers)
            .field("signature_len", &self.signature.len())
            .finish()
    }
}

/// Extract the raw signature parameter string from the request headers.
///
/// # Errors
///
/// Returns [`AuthError::MissingCredentials`] if neither an
/// `Authorization: Signature ...` header nor a `Signature` header is present,
/// and [`AuthError::MalformedSignature`] if the header is not valid text.
pub fn extract_credentials(headers: &http::HeaderMap) -> Result<&str, AuthError> {
    if let Some(value) = headers.get(http::header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::malformed("authorization header is not visible ASCII"))?;
        if let Some(params) = strip_scheme(value) {
            return Ok(params);
        }
    }

    match headers.get(SIGNATURE_HEADER) {
        Some(value) => value
            .to_str()
            .map(str::trim)
            .map_err(|_| AuthError::malformed("signature header is not visible ASCII")),
        None => Err(AuthError::MissingCredentials),
    }
}

/// Strip a case-insensitive `Signature ` scheme prefix.
fn strip_scheme(value: &str) -> Option<&str> {
    let (scheme, rest) = value.trim_start().split_once(char::is_whitespace)?;
    scheme
        .eq_ignore_ascii_case(SIGNATURE_SCHEME)
        .then_some(rest.trim())
}

/// Parse a signature parameter string into [`SignatureParameters`].
///
/// # Errors
///
/// - [`AuthError::MalformedSignature`] if a required key is missing, a key is
///   repeated, a value is badly quoted, or `signature` is not valid base64.
/// - [`AuthError::UnsupportedAlgorithm`] if `algorithm` is not registered.
///
/// # Examples
///
/// ```
/// use checkgate_auth::params::parse_signature_params;
///
/// let params = parse_signature_params(
///     r#"keyId="k1",algorithm="hmac-sha256",headers="(request-target) Date",signature="AAAA""#,
/// )
/// .unwrap();
/// assert_eq!(params.key_id, "k1");
/// assert_eq!(params.covered_headers, vec!["(request-target)", "date"]);
/// ```
pub fn parse_signature_params(input: &str) -> Result<SignatureParameters, AuthError> {
    let pairs = split_pairs(input)?;

    let key_id = required(&pairs, "keyId")?;
    let algorithm_name = required(&pairs, "algorithm")?;
    let signature_b64 = required(&pairs, "signature")?;

    let algorithm: SignatureAlgorithm = algorithm_name.parse()?;

    let signature = BASE64
        .decode(signature_b64)
        .map_err(|_| AuthError::malformed("signature is not valid base64"))?;
    if signature.is_empty() {
        return Err(AuthError::malformed("signature is empty"));
    }

    let covered_headers = pairs
        .get("headers")
        .map(|list| {
            list.split_ascii_whitespace()
                .map(str::to_ascii_lowercase)
                .collect()
        })
        .unwrap_or_default();

    Ok(SignatureParameters {
        key_id: key_id.to_owned(),
        algorithm,
        covered_headers,
        signature,
    })
}

fn required<'a>(pairs: &HashMap<&str, &'a str>, key: &str) -> Result<&'a str, AuthError> {
    pairs
        .get(key)
        .copied()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AuthError::malformed(format!("missing {key} parameter")))
}

/// Split `a="1", b="2"` into a map, honouring commas inside quoted values.
fn split_pairs(input: &str) -> Result<HashMap<&str, &str>, AuthError> {
    let mut pairs = HashMap::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (idx, ch) in input.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                insert_pair(&mut pairs, &input[start..idx])?;
                start = idx + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err(AuthError::malformed("unterminated quoted value"));
    }
    insert_pair(&mut pairs, &input[start..])?;

    Ok(pairs)
}

fn insert_pair<'a>(pairs: &mut HashMap<&'a str, &'a str>, raw: &'a str) -> Result<(), AuthError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(());
    }

    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| AuthError::malformed("parameter without '='"))?;
    let key = key.trim();
    let value = unquote(value.trim())?;

    if key.is_empty() {
        return Err(AuthError::malformed("parameter with empty name"));
    }
    if pairs.insert(key, value).is_some() {
        return Err(AuthError::malformed(format!("duplicate {key} parameter")));
    }
    Ok(())
}

fn unquote(value: &str) -> Result<&str, AuthError> {
    match (value.starts_with('"'), value.len() >= 2 && value.ends_with('"')) {
        (true, true) => Ok(&value[1..value.len() - 1]),
        (false, _) if !value.contains('"') => Ok(value),
        _ => Err(AuthError::malformed("badly quoted parameter value")),
    }
}
