//! Route handler trait.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::HandlerError;
use crate::response::ResponseBody;

/// Future returned by [`RouteHandler::handle`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<ResponseBody>, HandlerError>> + Send>>;

/// Trait every route implementation provides.
///
/// The handler receives the request head and the fully collected body, and
/// returns a complete HTTP response. This is the boundary between the
/// transport and the business logic, and also the seam middleware such as
/// [`RequireSignature`](crate::guard::RequireSignature) wraps.
pub trait RouteHandler: Send + Sync + 'static {
    /// Handle one request.
    fn handle(&self, parts: http::request::Parts, body: Bytes) -> HandlerFuture;
}

/// A [`RouteHandler`] backed by a closure.
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Wrap an async closure as a [`RouteHandler`].
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(http::request::Parts, Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<http::Response<ResponseBody>, HandlerError>> + Send + 'static,
{
    FnHandler { f }
}

impl<F, Fut> RouteHandler for FnHandler<F>
where
    F: Fn(http::request::Parts, Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<http::Response<ResponseBody>, HandlerError>> + Send + 'static,
{
    fn handle(&self, parts: http::request::Parts, body: Bytes) -> HandlerFuture {
        Box::pin((self.f)(parts, body))
    }
}
