//! Integration tests for the CheckGate server.
//!
//! Each test starts a server in process on `127.0.0.1:0` and talks to it over
//! a real socket with `reqwest`. The server clock can be moved forward to
//! exercise the freshness window without sleeping.
//!
//! Run them with:
//! ```text
//! cargo test -p checkgate-integration
//! ```

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Once};

use checkgate_auth::{
    AuthenticationGate, Clock, KeyStore, RequestSigner, SignatureAlgorithm, SigningKey,
};
use checkgate_core::CheckGateConfig;
use checkgate_server::{build_service_with_gate, serve};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Key id registered on every test server.
pub const KEY_ID: &str = "integration";

/// HMAC secret for [`KEY_ID`].
pub const SECRET: &[u8] = b"integration-test-secret";

/// Key id of the Ed25519 client.
pub const ED25519_KEY_ID: &str = "ed-client";

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Wall clock shifted by an adjustable number of seconds.
#[derive(Debug, Default)]
pub struct OffsetClock {
    offset_secs: AtomicI64,
}

impl OffsetClock {
    /// Move the clock forward.
    pub fn advance(&self, secs: i64) {
        self.offset_secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + TimeDelta::seconds(self.offset_secs.load(Ordering::SeqCst))
    }
}

/// The Ed25519 key used by tests.
#[must_use]
pub fn ed25519_signing_key() -> ed25519_dalek::SigningKey {
    ed25519_dalek::SigningKey::from_bytes(&[9u8; 32])
}

/// A running in-process server. Shuts down when dropped.
#[derive(Debug)]
pub struct TestServer {
    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub base_url: String,
    /// The server's clock.
    pub clock: Arc<OffsetClock>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a server with the default configuration.
    pub async fn start() -> Self {
        Self::start_with(CheckGateConfig::default()).await
    }

    /// Start a server with `config`.
    pub async fn start_with(config: CheckGateConfig) -> Self {
        init_tracing();

        let keys = KeyStore::builder()
            .insert(KEY_ID, SignatureAlgorithm::HmacSha256, SECRET.to_vec())
            .insert(
                ED25519_KEY_ID,
                SignatureAlgorithm::Ed25519,
                ed25519_signing_key().verifying_key().to_bytes().to_vec(),
            )
            .build()
            .expect("test key store");

        let clock = Arc::new(OffsetClock::default());
        let gate = Arc::new(
            AuthenticationGate::new(Arc::new(keys), config.gate_config())
                .with_clock(Arc::clone(&clock) as Arc<dyn Clock>),
        );
        let service = build_service_with_gate(&config, &gate);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");

        let (tx, rx) = oneshot::channel();
        tokio::spawn(serve(listener, service, async move {
            rx.await.ok();
        }));

        Self {
            base_url: format!("http://{addr}"),
            clock,
            shutdown: Some(tx),
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Signer for the HMAC test key.
#[must_use]
pub fn signer() -> RequestSigner {
    RequestSigner::new(
        KEY_ID,
        SigningKey::hmac(SignatureAlgorithm::HmacSha256, SECRET),
    )
}

/// Build signed headers for a request. `preset` headers are set before
/// signing and are kept as given.
pub fn signed_headers(
    signer: &RequestSigner,
    method: &reqwest::Method,
    path: &str,
    body: &[u8],
    preset: &[(&str, &str)],
) -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    for (name, value) in preset {
        headers.insert(
            reqwest::header::HeaderName::from_bytes(name.as_bytes()).expect("header name"),
            reqwest::header::HeaderValue::from_str(value).expect("header value"),
        );
    }
    let uri = path.parse().expect("request target");
    signer
        .sign(method, &uri, &mut headers, body, Utc::now())
        .expect("sign request");
    headers
}

/// Send a request with explicit headers and body.
pub async fn send(
    server: &TestServer,
    method: reqwest::Method,
    path: &str,
    headers: reqwest::header::HeaderMap,
    body: &'static [u8],
) -> reqwest::Response {
    reqwest::Client::new()
        .request(method, server.url(path))
        .headers(headers)
        .body(body)
        .send()
        .await
        .expect("send request")
}

/// Sign with `signer` and send.
pub async fn send_signed(
    server: &TestServer,
    signer: &RequestSigner,
    method: reqwest::Method,
    path: &str,
    body: &'static [u8],
    preset: &[(&str, &str)],
) -> reqwest::Response {
    let headers = signed_headers(signer, &method, path, body, preset);
    send(server, method, path, headers, body).await
}

mod test_auth;
mod test_routes;
