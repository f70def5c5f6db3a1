//! HTTP service layer for CheckGate.
//!
//! This crate puts the signature gate in front of real routes:
//!
//! - **Router**: exact method and path matching with 404/405 handling
//! - **Handler trait**: the boundary between HTTP and business logic
//! - **Guard**: [`RequireSignature`] middleware that runs the gate before a handler
//! - **Service**: hyper `Service` that collects bodies and adds common headers
//! - **Response helpers**: JSON responses and the uniform 401

pub mod dispatch;
pub mod error;
pub mod guard;
pub mod response;
pub mod router;
pub mod service;

pub use dispatch::{FnHandler, HandlerFuture, RouteHandler, handler_fn};
pub use error::HandlerError;
pub use guard::{RequireSignature, require_signature};
pub use response::ResponseBody;
pub use router::{RouteMatch, Router};
pub use service::{CheckGateHttpService, HttpConfig};
