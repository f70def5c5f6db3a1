//! Signature-enforcing middleware.
//!
//! [`RequireSignature`] wraps any [`RouteHandler`] and runs the
//! [`AuthenticationGate`] before it. A denied request never reaches the inner
//! handler and always gets the same 401. An allowed request is passed through
//! untouched and the inner handler's response is returned as is.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use bytes::Bytes;
use checkgate_auth::{AuthVerdict, AuthenticationGate, DigestPolicy};
use tracing::error;

use crate::dispatch::{HandlerFuture, RouteHandler};
use crate::response::unauthorized;

/// A handler that only runs for correctly signed requests.
pub struct RequireSignature<H> {
    gate: Arc<AuthenticationGate>,
    inner: Arc<H>,
    digest_policy: Option<DigestPolicy>,
}

impl<H> fmt::Debug for RequireSignature<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequireSignature")
            .field("gate", &self.gate)
            .field("digest_policy", &self.digest_policy)
            .finish_non_exhaustive()
    }
}

impl<H> Clone for RequireSignature<H> {
    fn clone(&self) -> Self {
        Self {
            gate: Arc::clone(&self.gate),
            inner: Arc::clone(&self.inner),
            digest_policy: self.digest_policy,
        }
    }
}

/// Guard `handler` with `gate`.
pub fn require_signature<H: RouteHandler>(
    gate: Arc<AuthenticationGate>,
    handler: H,
) -> RequireSignature<H> {
    RequireSignature::new(gate, handler)
}

impl<H: RouteHandler> RequireSignature<H> {
    /// Guard `handler` with `gate`, using the gate's digest policy.
    pub fn new(gate: Arc<AuthenticationGate>, handler: H) -> Self {
        Self {
            gate,
            inner: Arc::new(handler),
            digest_policy: None,
        }
    }

    /// Override the digest policy for this route.
    #[must_use]
    pub fn with_digest_policy(mut self, policy: DigestPolicy) -> Self {
        self.digest_policy = Some(policy);
        self
    }

    fn check(&self, parts: &http::request::Parts, body: &[u8]) -> AuthVerdict {
        let policy = self
            .digest_policy
            .unwrap_or(self.gate.config().digest_policy);

        catch_unwind(AssertUnwindSafe(|| {
            self.gate.verdict_with_policy(parts, body, policy)
        }))
        .unwrap_or_else(|_| {
            error!("authentication gate panicked, denying request");
            AuthVerdict::deny(checkgate_auth::AuthErrorKind::Internal)
        })
    }
}

impl<H: RouteHandler> RouteHandler for RequireSignature<H> {
    fn handle(&self, parts: http::request::Parts, body: Bytes) -> HandlerFuture {
        if !self.check(&parts, &body).allowed {
            return Box::pin(async { Ok(unauthorized()) });
        }
        self.inner.handle(parts, body)
    }
}
