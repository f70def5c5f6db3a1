//! CheckGate Server - signed-request gateway for the check API.
//!
//! This binary serves the check API behind HTTP Signature authentication.
//! Every call to `/config` and `/checks` must be signed with a provisioned key;
//! `/` and `/health` are open.
//!
//! # Usage
//!
//! ```text
//! CHECKGATE_KEY_ID=integration CHECKGATE_KEY_SECRET=c2VjcmV0 checkgate-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `CHECKGATE_CLOCK_SKEW_SECS` | `30` | Accepted `date` skew, 1 to 119 seconds |
//! | `CHECKGATE_DIGEST_POLICY` | `when-body-present` | `when-body-present` or `always` |
//! | `CHECKGATE_MAX_BODY_BYTES` | `1048576` | Request body limit |
//! | `CHECKGATE_KEYS_FILE` | *(unset)* | JSON key provisioning file |
//! | `CHECKGATE_KEY_ID` | *(unset)* | Single key id |
//! | `CHECKGATE_KEY_SECRET` | *(unset)* | Base64 key material for `CHECKGATE_KEY_ID` |
//! | `CHECKGATE_KEY_ALGORITHM` | `hmac-sha256` | Algorithm for `CHECKGATE_KEY_ID` |

use std::net::SocketAddr;

use anyhow::{Context, Result};
use checkgate_core::CheckGateConfig;
use checkgate_server::{VERSION, build_service_from_config, serve};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Perform a health check by connecting to the gateway and requesting `/health`.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = CheckGateConfig::from_env().context("invalid configuration")?;

    // Handle --health-check flag for container health probes.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        clock_skew_secs = config.clock_skew_secs,
        digest_always = config.digest_always,
        max_body_bytes = config.max_body_bytes,
        version = VERSION,
        "starting CheckGate server",
    );

    let service = build_service_from_config(&config)?;

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    serve(listener, service, shutdown).await
}
