//! CheckGate server library.
//!
//! Wires configuration, key provisioning, the signature gate and the route
//! handlers into a hyper service, and runs the accept loop. The binary in
//! `main.rs` is a thin wrapper around [`build_service`] and [`serve`]; tests
//! use the same functions to run the server in process.

pub mod handler;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use checkgate_auth::{AuthenticationGate, KeyStore};
use checkgate_core::{CheckGateConfig, load_key_store};
use checkgate_http::{CheckGateHttpService, HttpConfig, Router, handler_fn, require_signature};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Server version reported in health check responses.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the route table. `/config` and `/checks` require a valid signature.
pub fn build_router(gate: &Arc<AuthenticationGate>) -> Router {
    Router::new()
        .get("/", handler_fn(handler::index))
        .get("/health", handler_fn(handler::health))
        .get(
            "/config",
            require_signature(Arc::clone(gate), handler_fn(handler::config)),
        )
        .post(
            "/checks",
            require_signature(Arc::clone(gate), handler_fn(handler::run_check)),
        )
}

/// Build the HTTP service from configuration and an already loaded key store.
#[must_use]
pub fn build_service(config: &CheckGateConfig, keys: KeyStore) -> CheckGateHttpService {
    let gate = Arc::new(AuthenticationGate::new(Arc::new(keys), config.gate_config()));
    build_service_with_gate(config, &gate)
}

/// Build the HTTP service around an existing gate.
#[must_use]
pub fn build_service_with_gate(
    config: &CheckGateConfig,
    gate: &Arc<AuthenticationGate>,
) -> CheckGateHttpService {
    CheckGateHttpService::new(
        build_router(gate),
        HttpConfig {
            max_body_bytes: config.max_body_bytes,
        },
    )
}

/// Load keys and build the service.
///
/// # Errors
///
/// Fails if key provisioning fails.
pub fn build_service_from_config(config: &CheckGateConfig) -> Result<CheckGateHttpService> {
    let keys = load_key_store(config).context("failed to provision signing keys")?;
    Ok(build_service(config, keys))
}

/// Run the accept loop until `shutdown` completes, then drain connections.
///
/// # Errors
///
/// Currently never fails; accept errors are logged and the loop continues.
pub async fn serve(
    listener: TcpListener,
    service: CheckGateHttpService,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained");

    Ok(())
}
