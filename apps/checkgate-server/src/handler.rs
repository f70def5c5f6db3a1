//! Route handlers for the check API.
//!
//! These are thin stand-ins: they return fixed documents and never talk to a
//! provider. Protected routes only run after the signature gate has allowed
//! the request.

use bytes::Bytes;
use checkgate_http::response::json_response;
use checkgate_http::{HandlerError, ResponseBody};
use http::StatusCode;
use serde_json::json;

use crate::VERSION;

/// Countries the integration reports as supported.
pub const SUPPORTED_COUNTRIES: [&str; 4] = ["GBR", "USA", "CAN", "NLD"];

type HandlerResult = Result<http::Response<ResponseBody>, HandlerError>;

/// `GET /`: integration metadata.
pub async fn index(_parts: http::request::Parts, _body: Bytes) -> HandlerResult {
    Ok(json_response(
        StatusCode::OK,
        &json!({
            "protocol_version": 1,
            "provider_name": "CheckGate",
            "supported_check_types": ["IDENTITY_CHECK"],
            "supported_countries": SUPPORTED_COUNTRIES,
            "supported_features": ["DEMO_RESULTS"],
            "supported_demo_results": ["ANY", "NO_MATCHES"],
        }),
    ))
}

/// `GET /config`: check configuration schema.
pub async fn config(_parts: http::request::Parts, _body: Bytes) -> HandlerResult {
    Ok(json_response(
        StatusCode::OK,
        &json!({
            "check_type": "IDENTITY_CHECK",
            "check_template": {
                "type": "ONE_TIME_SYNCHRONOUS",
                "timeout": 60,
            },
            "pricing": {
                "supports_reselling": false,
                "maximum_cost": 0,
            },
            "config_schema": [
                {"type": "boolean", "name": "require_dob", "label": "Require date of birth"},
            ],
            "credentials_fields": [],
        }),
    ))
}

/// `POST /checks`: run a check.
///
/// Live checks are not available, so every well-formed request gets the same
/// provider error back.
pub async fn run_check(_parts: http::request::Parts, body: Bytes) -> HandlerResult {
    if !body.is_empty() {
        serde_json::from_slice::<serde_json::Value>(&body)
            .map_err(|_| HandlerError::bad_request("request body is not valid JSON"))?;
    }

    Ok(json_response(
        StatusCode::OK,
        &json!({
            "errors": [{
                "type": "PROVIDER_MESSAGE",
                "message": "Live checks are not supported",
            }],
            "warnings": [],
        }),
    ))
}

/// `GET /health`: liveness.
pub async fn health(_parts: http::request::Parts, _body: Bytes) -> HandlerResult {
    Ok(json_response(
        StatusCode::OK,
        &json!({ "status": "running", "version": VERSION }),
    ))
}
