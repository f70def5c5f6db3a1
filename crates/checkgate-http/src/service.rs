//! CheckGate HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use tracing::{debug, error, warn};

use crate::response::{
    ResponseBody, error_response, error_to_response, internal_error, method_not_allowed, not_found,
    payload_too_large,
};
use crate::router::{RouteMatch, Router};

/// Value of the `server` header.
pub const SERVER_NAME: &str = "CheckGate";

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Largest request body that will be collected.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Hyper `Service` implementation for CheckGate.
///
/// Routes each request through the [`Router`], collects the body under the
/// configured limit, and runs the matched handler. Handler panics become 500s.
#[derive(Debug)]
pub struct CheckGateHttpService {
    router: Arc<Router>,
    config: Arc<HttpConfig>,
}

impl Clone for CheckGateHttpService {
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
            config: Arc::clone(&self.config),
        }
    }
}

impl CheckGateHttpService {
    /// Create a new `CheckGateHttpService`.
    #[must_use]
    pub fn new(router: Router, config: HttpConfig) -> Self {
        Self {
            router: Arc::new(router),
            config: Arc::new(config),
        }
    }

    /// Process one request with any body type and add the common headers.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<ResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = uuid::Uuid::new_v4().to_string();
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let response = process_request(req, &self.router, &self.config).await;

        debug!(
            %method,
            %path,
            status = response.status().as_u16(),
            %request_id,
            "request completed"
        );
        add_common_headers(response, &request_id)
    }
}

impl hyper::service::Service<http::Request<Incoming>> for CheckGateHttpService {
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

/// Process a single request through routing, body collection and dispatch.
async fn process_request<B>(
    req: http::Request<B>,
    router: &Router,
    config: &HttpConfig,
) -> http::Response<ResponseBody>
where
    B: http_body::Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, incoming) = req.into_parts();

    // 1. Route.
    let handler = match router.resolve(&parts.method, parts.uri.path()) {
        RouteMatch::Found(handler) => Arc::clone(handler),
        RouteMatch::MethodNotAllowed(allowed) => return method_not_allowed(&allowed),
        RouteMatch::NotFound => return not_found(),
    };

    // 2. Reject oversized bodies that announce their length.
    if declared_length(&parts.headers).is_some_and(|len| len > config.max_body_bytes) {
        return payload_too_large();
    }

    // 3. Collect body.
    let body = match collect_body(incoming, config.max_body_bytes).await {
        Ok(body) => body,
        Err(CollectError::TooLarge) => return payload_too_large(),
        Err(CollectError::Read(msg)) => {
            warn!(error = %msg, "failed to read request body");
            return error_response(http::StatusCode::BAD_REQUEST, "unreadable request body");
        }
    };

    // 4. Dispatch. Panics inside the handler are contained to this request.
    let outcome = AssertUnwindSafe(async move { handler.handle(parts, body).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            warn!(error = %err, "handler returned an error");
            error_to_response(&err)
        }
        Err(_) => {
            error!("handler panicked");
            internal_error()
        }
    }
}

enum CollectError {
    TooLarge,
    Read(String),
}

fn declared_length(headers: &http::HeaderMap) -> Option<usize> {
    headers
        .get(http::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Collect the body into one buffer, stopping at `limit` bytes.
async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, CollectError>
where
    B: http_body::Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    Limited::new(body, limit)
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                CollectError::TooLarge
            } else {
                CollectError::Read(err.to_string())
            }
        })
}

/// Add `x-request-id` and `server` when the response does not already carry
/// them. Status, body and handler-set headers are left as they are.
fn add_common_headers(
    mut response: http::Response<ResponseBody>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }

    headers
        .entry(http::header::SERVER)
        .or_insert(http::HeaderValue::from_static(SERVER_NAME));

    response
}
