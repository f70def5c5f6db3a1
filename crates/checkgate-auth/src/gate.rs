//! The authentication gate.
//!
//! [`AuthenticationGate`] runs the full verification pipeline for one request:
//!
//! 1. Extract the signature credential from the headers.
//! 2. Parse the signature parameters.
//! 3. Check the covered headers include `(request-target)`, `date`, and
//!    `digest` when the digest policy requires it.
//! 4. Build the signing string.
//! 5. Validate the body digest, if one is presented.
//! 6. Check the `date` header is fresh.
//! 7. Resolve the key for the exact `(keyId, algorithm)` pair.
//! 8. Verify the signature.
//!
//! The first failing stage ends the pipeline. Every failure is a deny; the
//! distinction between them exists only for logs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::algorithm::verify_signature;
use crate::canonical::{REQUEST_TARGET, canonicalize};
use crate::digest::{DIGEST_HEADER, validate_digest};
use crate::error::{AuthError, AuthErrorKind};
use crate::freshness::{Clock, DATE_HEADER, DEFAULT_CLOCK_SKEW, SystemClock, check_request_freshness};
use crate::keystore::KeyResolver;
use crate::params::{SignatureParameters, extract_credentials, parse_signature_params};

/// When a request must carry a covered `digest` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestPolicy {
    /// Only requests with a non-empty body.
    #[default]
    WhenBodyPresent,
    /// Every request, including bodyless ones.
    Always,
}

impl DigestPolicy {
    /// Whether a request with this body must present a covered digest.
    #[must_use]
    pub fn requires_digest(self, body: &[u8]) -> bool {
        match self {
            Self::WhenBodyPresent => !body.is_empty(),
            Self::Always => true,
        }
    }
}

/// Tunables for [`AuthenticationGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Maximum allowed difference between the `date` header and server time.
    pub clock_skew: Duration,
    /// Default digest policy for routes that do not override it.
    pub digest_policy: DigestPolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            clock_skew: DEFAULT_CLOCK_SKEW,
            digest_policy: DigestPolicy::default(),
        }
    }
}

/// Outcome of authenticating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthVerdict {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Why it was denied. Internal only.
    pub reason: Option<AuthErrorKind>,
}

impl AuthVerdict {
    /// An allow verdict.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// A deny verdict.
    #[must_use]
    pub fn deny(reason: AuthErrorKind) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

impl From<&Result<(), AuthError>> for AuthVerdict {
    fn from(result: &Result<(), AuthError>) -> Self {
        match result {
            Ok(()) => Self::allow(),
            Err(err) => Self::deny(err.kind()),
        }
    }
}

/// Verifies signed requests against an injected key resolver.
///
/// The gate holds no per-request state. One instance can be shared by every
/// connection task.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use checkgate_auth::{AuthenticationGate, GateConfig, KeyStore, SignatureAlgorithm};
///
/// let keys = KeyStore::builder()
///     .insert("integration", SignatureAlgorithm::HmacSha256, b"secret".to_vec())
///     .build()
///     .unwrap();
/// let gate = AuthenticationGate::new(Arc::new(keys), GateConfig::default());
///
/// let (parts, ()) = http::Request::get("/config").body(()).unwrap().into_parts();
/// assert!(!gate.verdict(&parts, b"").allowed);
/// ```
#[derive(Clone)]
pub struct AuthenticationGate {
    resolver: Arc<dyn KeyResolver>,
    clock: Arc<dyn Clock>,
    config: GateConfig,
}

impl fmt::Debug for AuthenticationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationGate")
            .field("resolver", &"...")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AuthenticationGate {
    /// Create a gate that reads the system clock.
    pub fn new(resolver: Arc<dyn KeyResolver>, config: GateConfig) -> Self {
        Self {
            resolver,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock used for freshness checks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The gate configuration.
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Run the pipeline with the gate's default digest policy.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the first failing stage.
    pub fn authenticate(&self, parts: &http::request::Parts, body: &[u8]) -> Result<(), AuthError> {
        self.authenticate_with_policy(parts, body, self.config.digest_policy)
    }

    /// Run the pipeline with an explicit digest policy.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the first failing stage.
    pub fn authenticate_with_policy(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
        policy: DigestPolicy,
    ) -> Result<(), AuthError> {
        let raw = extract_credentials(&parts.headers)?;
        let params = parse_signature_params(raw)?;

        check_required_coverage(&params, policy.requires_digest(body))?;
        for name in [DATE_HEADER, DIGEST_HEADER] {
            reject_repeated(&parts.headers, name)?;
        }

        let signing_string = canonicalize(parts, &params.covered_headers)?;
        trace!(
            signing_string = %String::from_utf8_lossy(&signing_string),
            "built signing string"
        );

        if let Some(value) = parts.headers.get(DIGEST_HEADER) {
            let value = value
                .to_str()
                .map_err(|_| AuthError::malformed("digest header is not visible ASCII"))?;
            validate_digest(value, body)?;
        }

        check_request_freshness(&parts.headers, self.clock.now(), self.config.clock_skew)?;

        let record = self
            .resolver
            .resolve(&params.key_id, params.algorithm)
            .map_err(|err| AuthError::Internal(format!("key resolution failed: {err}")))?
            .filter(|record| record.algorithm == params.algorithm)
            .ok_or_else(|| AuthError::UnknownKey(params.key_id.clone()))?;

        verify_signature(
            params.algorithm,
            record.secret.expose(),
            &signing_string,
            &params.signature,
        )?;

        debug!(
            key_id = %params.key_id,
            algorithm = %params.algorithm,
            "signature verified"
        );
        Ok(())
    }

    /// Run the pipeline and log the outcome.
    #[must_use]
    pub fn verdict(&self, parts: &http::request::Parts, body: &[u8]) -> AuthVerdict {
        self.verdict_with_policy(parts, body, self.config.digest_policy)
    }

    /// Run the pipeline with an explicit digest policy and log the outcome.
    #[must_use]
    pub fn verdict_with_policy(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
        policy: DigestPolicy,
    ) -> AuthVerdict {
        let result = self.authenticate_with_policy(parts, body, policy);
        if let Err(ref err) = result {
            warn!(
                reason = %err.kind(),
                detail = %err,
                method = %parts.method,
                path = parts.uri.path(),
                "request authentication denied"
            );
        }
        AuthVerdict::from(&result)
    }
}

/// Reject a signature that does not bind the parts of the request this server
/// relies on. Runs before any cryptographic work.
///
/// # Errors
///
/// Returns [`AuthError::InsufficientCoverage`] naming the first missing entry.
pub fn check_required_coverage(
    params: &SignatureParameters,
    digest_required: bool,
) -> Result<(), AuthError> {
    if params.covered_headers.is_empty() {
        return Err(AuthError::coverage("no covered headers declared"));
    }

    let mut required = vec![REQUEST_TARGET, DATE_HEADER];
    if digest_required {
        required.push(DIGEST_HEADER);
    }

    match required.into_iter().find(|name| !params.covers(name)) {
        Some(missing) => Err(AuthError::coverage(format!("{missing} is not covered"))),
        None => Ok(()),
    }
}

/// The freshness and digest stages read a single value, so a second copy of
/// `name` is refused rather than checked differently than it was signed.
fn reject_repeated(headers: &http::HeaderMap, name: &str) -> Result<(), AuthError> {
    if headers.get_all(name).iter().nth(1).is_some() {
        return Err(AuthError::malformed(format!("{name} header is repeated")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::algorithm::SignatureAlgorithm;
    use crate::digest::{DigestAlgorithm, digest_header_value};
    use crate::freshness::{FixedClock, format_http_date};
    use crate::keystore::{KeyRecord, KeyStore};
    use crate::signing::{RequestSigner, SigningKey};

    const KEY_ID: &str = "integration";
    const SECRET: &[u8] = b"a-very-secret-key";
    const BODY: &[u8] = br#"{"id":"c0ffee"}"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap()
    }

    fn gate() -> AuthenticationGate {
        let keys = KeyStore::builder()
            .insert(KEY_ID, SignatureAlgorithm::HmacSha256, SECRET.to_vec())
            .build()
            .unwrap();
        AuthenticationGate::new(Arc::new(keys), GateConfig::default())
            .with_clock(Arc::new(FixedClock(now())))
    }

    fn signer() -> RequestSigner {
        RequestSigner::new(KEY_ID, SigningKey::hmac(SignatureAlgorithm::HmacSha256, SECRET))
    }

    fn unsigned() -> http::request::Parts {
        http::Request::builder()
            .method("POST")
            .uri("/checks")
            .header("host", "app")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn signed_with(signer: &RequestSigner, body: &[u8]) -> http::request::Parts {
        let mut parts = unsigned();
        signer.sign_parts(&mut parts, body, now()).unwrap();
        parts
    }

    fn signed(body: &[u8]) -> http::request::Parts {
        signed_with(&signer(), body)
    }

    fn err(parts: &http::request::Parts, body: &[u8]) -> AuthErrorKind {
        gate().authenticate(parts, body).unwrap_err().kind()
    }

    #[test]
    fn test_should_allow_correctly_signed_request() {
        let parts = signed(BODY);
        assert_eq!(gate().authenticate(&parts, BODY), Ok(()));
        assert_eq!(gate().verdict(&parts, BODY), AuthVerdict::allow());
    }

    #[test]
    fn test_should_allow_same_request_twice_within_window() {
        let gate = gate();
        let parts = signed(BODY);
        assert!(gate.verdict(&parts, BODY).allowed);
        assert!(gate.verdict(&parts, BODY).allowed);
    }

    #[test]
    fn test_should_deny_repeated_date_or_digest_header() {
        let mut parts = signed(BODY);
        let stale = format_http_date(now() - TimeDelta::seconds(600));
        parts
            .headers
            .append(DATE_HEADER, http::HeaderValue::from_str(&stale).unwrap());
        assert_eq!(err(&parts, BODY), AuthErrorKind::MalformedSignature);

        let mut parts = signed(BODY);
        let forged = digest_header_value(DigestAlgorithm::Sha256, b"other body");
        parts
            .headers
            .append(DIGEST_HEADER, http::HeaderValue::from_str(&forged).unwrap());
        assert_eq!(err(&parts, BODY), AuthErrorKind::MalformedSignature);
    }

    #[test]
    fn test_should_deny_request_without_credentials() {
        let parts = unsigned();
        assert_eq!(err(&parts, BODY), AuthErrorKind::MissingCredentials);
    }

    #[test]
    fn test_should_deny_request_signed_with_other_key() {
        let other = RequestSigner::new(
            KEY_ID,
            SigningKey::hmac(SignatureAlgorithm::HmacSha256, b"not-the-secret"),
        );
        let parts = signed_with(&other, BODY);
        assert_eq!(err(&parts, BODY), AuthErrorKind::BadSignature);
    }

    #[test]
    fn test_should_deny_unknown_key_id_and_algorithm_pair() {
        let unknown = RequestSigner::new(
            "someone-else",
            SigningKey::hmac(SignatureAlgorithm::HmacSha256, SECRET),
        );
        assert_eq!(
            err(&signed_with(&unknown, BODY), BODY),
            AuthErrorKind::UnknownKey
        );

        let other_alg = RequestSigner::new(
            KEY_ID,
            SigningKey::hmac(SignatureAlgorithm::HmacSha512, SECRET),
        );
        assert_eq!(
            err(&signed_with(&other_alg, BODY), BODY),
            AuthErrorKind::UnknownKey
        );
    }

    #[test]
    fn test_should_deny_when_date_is_not_covered_even_if_signature_verifies() {
        let partial = signer().with_headers(&["(request-target)", "digest"]);
        let parts = signed_with(&partial, BODY);
        assert_eq!(err(&parts, BODY), AuthErrorKind::InsufficientCoverage);
    }

    #[test]
    fn test_should_deny_when_request_target_is_not_covered() {
        let partial = signer().with_headers(&["date", "digest"]);
        let parts = signed_with(&partial, BODY);
        assert_eq!(err(&parts, BODY), AuthErrorKind::InsufficientCoverage);
    }

    #[test]
    fn test_should_deny_body_without_covered_digest() {
        let partial = signer().with_headers(&["(request-target)", "date"]);
        let parts = signed_with(&partial, BODY);
        assert_eq!(err(&parts, BODY), AuthErrorKind::InsufficientCoverage);
    }

    #[test]
    fn test_should_allow_bodyless_request_without_digest() {
        let parts = signed(b"");
        assert!(parts.headers.get(DIGEST_HEADER).is_none());
        assert_eq!(gate().authenticate(&parts, b""), Ok(()));
    }

    #[test]
    fn test_should_require_digest_on_bodyless_request_when_policy_is_always() {
        let parts = signed(b"");
        let result = gate().authenticate_with_policy(&parts, b"", DigestPolicy::Always);
        assert_eq!(
            result.unwrap_err().kind(),
            AuthErrorKind::InsufficientCoverage
        );
    }

    #[test]
    fn test_should_deny_stale_request() {
        let mut parts = unsigned();
        parts.headers.insert(
            DATE_HEADER,
            format_http_date(now() - TimeDelta::seconds(120)).parse().unwrap(),
        );
        signer().sign_parts(&mut parts, BODY, now()).unwrap();
        assert_eq!(err(&parts, BODY), AuthErrorKind::StaleRequest);
    }

    #[test]
    fn test_should_deny_replay_after_window_elapses() {
        let parts = signed(BODY);
        let later = gate().with_clock(Arc::new(FixedClock(now() + TimeDelta::seconds(120))));
        assert!(!later.verdict(&parts, BODY).allowed);
    }

    #[test]
    fn test_should_deny_mismatched_digest() {
        let mut parts = unsigned();
        parts.headers.insert(
            DIGEST_HEADER,
            digest_header_value(DigestAlgorithm::Sha256, b"something else")
                .parse()
                .unwrap(),
        );
        signer().sign_parts(&mut parts, BODY, now()).unwrap();
        assert_eq!(err(&parts, BODY), AuthErrorKind::BodyTampered);
    }

    #[test]
    fn test_should_deny_body_swapped_after_signing() {
        let parts = signed(BODY);
        assert_eq!(
            err(&parts, br#"{"id":"deadbeef"}"#),
            AuthErrorKind::BodyTampered
        );
    }

    #[test]
    fn test_should_deny_when_request_target_changes() {
        let mut parts = signed(BODY);
        parts.uri = "/config".parse().unwrap();
        assert_eq!(err(&parts, BODY), AuthErrorKind::BadSignature);
    }

    #[test]
    fn test_should_deny_malformed_credentials() {
        let mut parts = signed(BODY);
        parts.headers.insert(
            http::header::AUTHORIZATION,
            http::HeaderValue::from_static(r#"Signature keyId="integration""#),
        );
        assert_eq!(err(&parts, BODY), AuthErrorKind::MalformedSignature);
    }

    #[test]
    fn test_should_deny_when_resolver_fails() {
        struct BrokenResolver;

        impl KeyResolver for BrokenResolver {
            fn resolve(
                &self,
                _key_id: &str,
                _algorithm: SignatureAlgorithm,
            ) -> Result<Option<KeyRecord>, AuthError> {
                Err(AuthError::Internal("backend unavailable".to_owned()))
            }
        }

        let gate = AuthenticationGate::new(Arc::new(BrokenResolver), GateConfig::default())
            .with_clock(Arc::new(FixedClock(now())));
        let verdict = gate.verdict(&signed(BODY), BODY);
        assert_eq!(verdict, AuthVerdict::deny(AuthErrorKind::Internal));
    }

    #[test]
    fn test_should_verify_ed25519_signed_request() {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&[42u8; 32]);
        let public = signing_key.verifying_key().to_bytes();
        let keys = KeyStore::builder()
            .insert("ed-client", SignatureAlgorithm::Ed25519, public.to_vec())
            .build()
            .unwrap();
        let gate = AuthenticationGate::new(Arc::new(keys), GateConfig::default())
            .with_clock(Arc::new(FixedClock(now())));

        let signer = RequestSigner::new("ed-client", SigningKey::ed25519(signing_key));
        let parts = signed_with(&signer, BODY);
        assert_eq!(gate.authenticate(&parts, BODY), Ok(()));
    }

    #[test]
    fn test_should_verify_concurrently_from_shared_gate() {
        let gate = Arc::new(gate());
        let parts = signed(BODY);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let gate = Arc::clone(&gate);
                let parts = &parts;
                scope.spawn(move || {
                    for _ in 0..16 {
                        assert!(gate.verdict(parts, BODY).allowed);
                    }
                });
            }
        });
    }

    #[test]
    fn test_should_reject_empty_coverage_before_crypto() {
        let params = SignatureParameters {
            key_id: KEY_ID.to_owned(),
            algorithm: SignatureAlgorithm::HmacSha256,
            covered_headers: Vec::new(),
            signature: vec![1, 2, 3],
        };
        assert!(matches!(
            check_required_coverage(&params, false),
            Err(AuthError::InsufficientCoverage(_))
        ));
    }
}
