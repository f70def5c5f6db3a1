//! Signing string construction.
//!
//! The signing string is one line per covered header, in exactly the order the
//! client listed them, joined by `\n` with no trailing newline:
//!
//! ```text
//! (request-target): post /checks
//! date: Tue, 07 Jun 2014 20:51:35 GMT
//! digest: SHA-256=X48E9qOokqqrvdts8nOJRJN3OWDUoyWxBf7kbu9DBPE=
//! ```
//!
//! Unlike SigV4 there is no sorting, trimming, or whitespace folding: the bytes
//! must match what the signer produced from the same request.

use crate::error::AuthError;

/// Pseudo-header naming the request method and target.
pub const REQUEST_TARGET: &str = "(request-target)";

/// Build the `(request-target)` value: lowercased method, a space, and the raw
/// path and query.
///
/// # Examples
///
/// ```
/// use checkgate_auth::canonical::request_target;
///
/// let uri: http::Uri = "/checks?dry_run=1".parse().unwrap();
/// assert_eq!(request_target(&http::Method::POST, &uri), "post /checks?dry_run=1");
/// ```
#[must_use]
pub fn request_target(method: &http::Method, uri: &http::Uri) -> String {
    let method = method.as_str().to_ascii_lowercase();
    let path = match uri.path() {
        "" => "/",
        path => path,
    };
    match uri.query() {
        Some(query) => format!("{method} {path}?{query}"),
        None => format!("{method} {path}"),
    }
}

/// Build the signing string for `covered` headers against a live request.
///
/// Repeated headers are joined with `", "` in the order they were received.
/// Header values are copied byte for byte, so opaque (non-ASCII) values are
/// signed as received.
///
/// # Errors
///
/// Returns [`AuthError::MalformedSignature`] if a covered header is absent
/// from the request.
pub fn build_signing_string(
    method: &http::Method,
    uri: &http::Uri,
    headers: &http::HeaderMap,
    covered: &[String],
) -> Result<Vec<u8>, AuthError> {
    let mut out = Vec::new();

    for (i, name) in covered.iter().enumerate() {
        let name = name.to_ascii_lowercase();
        if i > 0 {
            out.push(b'\n');
        }
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        if name == REQUEST_TARGET {
            out.extend_from_slice(request_target(method, uri).as_bytes());
        } else {
            append_header_value(&mut out, headers, &name)?;
        }
    }

    Ok(out)
}

/// Build the signing string from request parts.
///
/// # Errors
///
/// See [`build_signing_string`].
pub fn canonicalize(
    parts: &http::request::Parts,
    covered: &[String],
) -> Result<Vec<u8>, AuthError> {
    build_signing_string(&parts.method, &parts.uri, &parts.headers, covered)
}

fn append_header_value(
    out: &mut Vec<u8>,
    headers: &http::HeaderMap,
    name: &str,
) -> Result<(), AuthError> {
    let mut values = headers.get_all(name).iter().peekable();
    if values.peek().is_none() {
        return Err(AuthError::malformed(format!(
            "covered header {name} is missing from the request"
        )));
    }

    for (i, value) in values.enumerate() {
        if i > 0 {
            out.extend_from_slice(b", ");
        }
        out.extend_from_slice(value.as_bytes());
    }
    Ok(())
}
