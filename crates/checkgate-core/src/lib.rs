//! Core configuration, key provisioning, and error types for CheckGate.
//!
//! This crate turns the process environment into the pieces the server needs
//! before it starts accepting connections: a validated [`CheckGateConfig`] and
//! the immutable key store handed to the authentication gate.

mod config;
mod error;
mod keys;

pub use config::{CheckGateConfig, DEFAULT_MAX_BODY_BYTES};
pub use error::{CheckGateError, CheckGateResult};
pub use keys::{KeyEntry, load_key_store, parse_key_entries};
