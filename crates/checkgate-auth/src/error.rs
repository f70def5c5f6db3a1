//! Error types for HTTP signature authentication.
//!
//! Every failure in the verification pipeline is an [`AuthError`]. The variants
//! exist for diagnostics only: the HTTP layer collapses all of them into the
//! same `401 Unauthorized` response, so nothing here ever reaches a caller.
//!
//! Messages may name a header or a key id. They never include secret bytes,
//! signature bytes, or computed digests.

use std::fmt;

/// Errors that can occur while authenticating a signed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No signature credential was presented.
    #[error("missing signature credentials")]
    MissingCredentials,

    /// The credential header is present but cannot be used.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The signature does not cover the headers this server requires.
    #[error("insufficient signature coverage: {0}")]
    InsufficientCoverage(String),

    /// The `date` header is missing, unparsable, or outside the freshness window.
    #[error("stale request: {0}")]
    StaleRequest(String),

    /// The body does not match the presented digest.
    #[error("body digest mismatch")]
    BodyTampered,

    /// No key is registered for the presented `(keyId, algorithm)` pair.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// The signature does not verify against the canonical string.
    #[error("signature does not match")]
    BadSignature,

    /// The signature or digest algorithm is not in the registry.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// An unexpected failure inside the pipeline or a key backend.
    ///
    /// Treated exactly like every other variant: the request is denied.
    #[error("internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Build a [`AuthError::MalformedSignature`] from any displayable reason.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSignature(reason.into())
    }

    /// Build a [`AuthError::InsufficientCoverage`] from any displayable reason.
    pub fn coverage(reason: impl Into<String>) -> Self {
        Self::InsufficientCoverage(reason.into())
    }

    /// Build a [`AuthError::StaleRequest`] from any displayable reason.
    pub fn stale(reason: impl Into<String>) -> Self {
        Self::StaleRequest(reason.into())
    }

    /// The fieldless kind of this error, suitable for a structured log field.
    #[must_use]
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::MissingCredentials => AuthErrorKind::MissingCredentials,
            Self::MalformedSignature(_) => AuthErrorKind::MalformedSignature,
            Self::InsufficientCoverage(_) => AuthErrorKind::InsufficientCoverage,
            Self::StaleRequest(_) => AuthErrorKind::StaleRequest,
            Self::BodyTampered => AuthErrorKind::BodyTampered,
            Self::UnknownKey(_) => AuthErrorKind::UnknownKey,
            Self::BadSignature => AuthErrorKind::BadSignature,
            Self::UnsupportedAlgorithm(_) => AuthErrorKind::UnsupportedAlgorithm,
            Self::Internal(_) => AuthErrorKind::Internal,
        }
    }
}

/// The reason a request was denied, without any attached detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// See [`AuthError::MissingCredentials`].
    MissingCredentials,
    /// See [`AuthError::MalformedSignature`].
    MalformedSignature,
    /// See [`AuthError::InsufficientCoverage`].
    InsufficientCoverage,
    /// See [`AuthError::StaleRequest`].
    StaleRequest,
    /// See [`AuthError::BodyTampered`].
    BodyTampered,
    /// See [`AuthError::UnknownKey`].
    UnknownKey,
    /// See [`AuthError::BadSignature`].
    BadSignature,
    /// See [`AuthError::UnsupportedAlgorithm`].
    UnsupportedAlgorithm,
    /// See [`AuthError::Internal`].
    Internal,
}

impl AuthErrorKind {
    /// Stable identifier used in log output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingCredentials => "MissingCredentials",
            Self::MalformedSignature => "MalformedSignature",
            Self::InsufficientCoverage => "InsufficientCoverage",
            Self::StaleRequest => "StaleRequest",
            Self::BodyTampered => "BodyTampered",
            Self::UnknownKey => "UnknownKey",
            Self::BadSignature => "BadSignature",
            Self::UnsupportedAlgorithm => "UnsupportedAlgorithm",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_every_variant_to_its_kind() {
        let cases = [
            (AuthError::MissingCredentials, AuthErrorKind::MissingCredentials),
            (AuthError::malformed("x"), AuthErrorKind::MalformedSignature),
            (AuthError::coverage("x"), AuthErrorKind::InsufficientCoverage),
            (AuthError::stale("x"), AuthErrorKind::StaleRequest),
            (AuthError::BodyTampered, AuthErrorKind::BodyTampered),
            (AuthError::UnknownKey("k".to_owned()), AuthErrorKind::UnknownKey),
            (AuthError::BadSignature, AuthErrorKind::BadSignature),
            (
                AuthError::UnsupportedAlgorithm("rsa-md5".to_owned()),
                AuthErrorKind::UnsupportedAlgorithm,
            ),
            (AuthError::Internal("boom".to_owned()), AuthErrorKind::Internal),
        ];

        for (err, kind) in cases {
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_should_display_kind_as_variant_name() {
        assert_eq!(AuthErrorKind::StaleRequest.to_string(), "StaleRequest");
    }
}
