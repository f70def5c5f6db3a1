//! HTTP message signature verification for CheckGate.
//!
//! This crate verifies draft-cavage HTTP Signatures on incoming requests. A
//! client signs a selected set of headers with a key the server knows, and the
//! server rebuilds the same signing string and checks the signature.
//!
//! # Overview
//!
//! A protected request carries:
//!
//! - an `Authorization: Signature ...` (or bare `Signature`) header naming the
//!   key, the algorithm, the covered headers and the signature,
//! - a `date` header that must be within the clock-skew window,
//! - a `digest` header binding the body, whenever the body is non-empty.
//!
//! The server requires `(request-target)` and `date` to be covered on every
//! request, and `digest` to be covered whenever it is required.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use checkgate_auth::{
//!     AuthenticationGate, GateConfig, KeyStore, RequestSigner, SignatureAlgorithm, SigningKey,
//! };
//!
//! let keys = KeyStore::builder()
//!     .insert("integration", SignatureAlgorithm::HmacSha256, b"secret".to_vec())
//!     .build()
//!     .unwrap();
//! let gate = AuthenticationGate::new(Arc::new(keys), GateConfig::default());
//!
//! let body = br#"{"hello": "world"}"#;
//! let (mut parts, ()) = http::Request::post("/checks").body(()).unwrap().into_parts();
//! RequestSigner::new(
//!     "integration",
//!     SigningKey::hmac(SignatureAlgorithm::HmacSha256, b"secret"),
//! )
//! .sign_parts(&mut parts, body, Utc::now())
//! .unwrap();
//!
//! assert!(gate.verdict(&parts, body).allowed);
//! ```
//!
//! # Modules
//!
//! - [`algorithm`] - Signature algorithm registry and verifiers
//! - [`canonical`] - Signing string construction
//! - [`digest`] - Body digest validation
//! - [`error`] - Authentication error types
//! - [`freshness`] - `date` header freshness and clocks
//! - [`gate`] - The verification pipeline
//! - [`keystore`] - Key resolver trait and in-memory key store
//! - [`params`] - Signature parameter parsing
//! - [`signing`] - Client-side request signing

pub mod algorithm;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod freshness;
pub mod gate;
pub mod keystore;
pub mod params;
pub mod signing;

pub use algorithm::SignatureAlgorithm;
pub use digest::DigestAlgorithm;
pub use error::{AuthError, AuthErrorKind};
pub use freshness::{Clock, FixedClock, SystemClock};
pub use gate::{AuthVerdict, AuthenticationGate, DigestPolicy, GateConfig};
pub use keystore::{KeyMaterial, KeyRecord, KeyResolver, KeyStore, KeyStoreBuilder, KeyStoreError};
pub use params::SignatureParameters;
pub use signing::{RequestSigner, SigningKey};
