//! Response construction.
//!
//! All error responses are small JSON documents of the form
//! `{"error": "<message>"}`. The 401 response is a fixed constant: it is the
//! same bytes and headers for every authentication failure.

use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode, header};
use http_body_util::Full;

use crate::error::HandlerError;

/// Body of every response. Handlers return small buffered documents.
pub type ResponseBody = Full<Bytes>;

/// Content type for JSON responses.
pub const CONTENT_TYPE: &str = "application/json";

/// Body of every 401 response.
pub const UNAUTHORIZED_BODY: &str = r#"{"error":"unauthorized"}"#;

/// Challenge sent with every 401 response.
pub const WWW_AUTHENTICATE: &str =
    r#"Signature realm="checkgate",headers="(request-target) date digest""#;

fn with_status(status: StatusCode, body: ResponseBody) -> http::Response<ResponseBody> {
    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(CONTENT_TYPE),
    );
    response
}

/// Build a JSON response.
#[must_use]
pub fn json_response(status: StatusCode, value: &serde_json::Value) -> http::Response<ResponseBody> {
    with_status(status, ResponseBody::from(value.to_string()))
}

/// Build an `{"error": ...}` response.
#[must_use]
pub fn error_response(status: StatusCode, message: &str) -> http::Response<ResponseBody> {
    json_response(status, &serde_json::json!({ "error": message }))
}

/// The uniform authentication failure response.
#[must_use]
pub fn unauthorized() -> http::Response<ResponseBody> {
    let mut response = with_status(
        StatusCode::UNAUTHORIZED,
        ResponseBody::from(UNAUTHORIZED_BODY),
    );
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(WWW_AUTHENTICATE),
    );
    response
}

/// 404 for an unrouted path.
#[must_use]
pub fn not_found() -> http::Response<ResponseBody> {
    error_response(StatusCode::NOT_FOUND, "not found")
}

/// 405 listing the methods the path does accept.
#[must_use]
pub fn method_not_allowed(allowed: &[Method]) -> http::Response<ResponseBody> {
    let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

/// 413 for a body over the configured limit.
#[must_use]
pub fn payload_too_large() -> http::Response<ResponseBody> {
    error_response(StatusCode::PAYLOAD_TOO_LARGE, "payload too large")
}

/// 500 with no detail.
#[must_use]
pub fn internal_error() -> http::Response<ResponseBody> {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

/// Convert a handler error into a response.
#[must_use]
pub fn error_to_response(error: &HandlerError) -> http::Response<ResponseBody> {
    match error {
        HandlerError::BadRequest(message) => error_response(StatusCode::BAD_REQUEST, message),
    }
}
