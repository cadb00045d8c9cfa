//! wtf-serve
//!
//! Serves a small echo service through a bare local bind or a relay URL,
//! under the listener supervisor.
//!
//! ```text
//! wtf-serve :8080#secret
//! wtf-serve "tcp://127.0.0.1:9000/?gc=2s&retry=5&persist=true"
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{extract::Request, Json, Router};
use clap::Parser;
use serde_json::{json, Value};

use wtf_serve::config::loader::{load_config, RunFile};
use wtf_serve::lifecycle::shutdown_signal;
use wtf_serve::net::TlsPaths;
use wtf_serve::observability::{logging, metrics};
use wtf_serve::{resolve, Supervisor, TcpTransport};

#[derive(Parser)]
#[command(name = "wtf-serve", version)]
#[command(about = "Serve an HTTP handler through a supervised local or relay listener", long_about = None)]
struct Cli {
    /// Bare bind (`:8080#password`) or relay URL (`scheme://host/?gc=5s#password`).
    address: Option<String>,

    /// TOML run file; command line values take precedence.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `wtf_serve=trace`.
    #[arg(short, long)]
    log_level: Option<String>,

    /// PEM certificate for TLS on bare binds.
    #[arg(long, env = "CERT")]
    cert: Option<PathBuf>,

    /// PEM private key for TLS on bare binds.
    #[arg(long, env = "KEY")]
    key: Option<PathBuf>,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => load_config(path)?,
        None => RunFile::default(),
    };

    logging::init_logging(cli.log_level.as_deref().or(file.log_level.as_deref()));

    let metrics_address = match (cli.metrics_address, &file.metrics_address) {
        (Some(addr), _) => Some(addr),
        (None, Some(raw)) => Some(raw.parse::<SocketAddr>()?),
        (None, None) => None,
    };
    if let Some(addr) = metrics_address {
        metrics::init_metrics(addr)?;
    }

    let address = cli
        .address
        .or(file.address)
        .ok_or("no address given: pass ADDRESS or set `address` in the run file")?;

    let mut transport = TcpTransport::new();
    if let (Some(cert_path), Some(key_path)) = (cli.cert.or(file.cert_path), cli.key.or(file.key_path)) {
        transport = transport.with_tls(TlsPaths { cert_path, key_path });
    }

    let config = resolve(&address)?;
    tracing::debug!(
        address = %config.address,
        dial_timeout = ?config.dial_timeout,
        health_check_interval = ?config.health_check_interval,
        health_check_retry = config.health_check_retry,
        persist = config.persist,
        "Configuration resolved"
    );

    let supervisor = Supervisor::new(transport, config, Some(echo_router()));
    tokio::select! {
        result = supervisor.run() => result?,
        _ = shutdown_signal() => {}
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn echo_router() -> Router {
    Router::new().fallback(echo)
}

/// Echo the request line and headers back as JSON.
async fn echo(request: Request) -> Json<Value> {
    let headers: serde_json::Map<String, Value> = request
        .headers()
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.to_string(), Value::String(value))
        })
        .collect();

    Json(json!({
        "method": request.method().as_str(),
        "path": request.uri().path(),
        "query": request.uri().query(),
        "headers": headers,
    }))
}
