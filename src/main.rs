use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use axum::routing::post;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ntp_time_server::handlers::{mcp_handler, AppState};
use ntp_time_server::stdio::serve_stdio;
use ntp_time_server::TimeResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// Line-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// JSON-RPC over HTTP POST to /mcp
    Http,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Transport the MCP server is exposed on
    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,
    /// Address the HTTP transport listens on
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
    /// Path to the TLS certificate file (HTTP transport only)
    #[arg(long)]
    tls_cert: Option<PathBuf>,
    /// Path to the TLS key file (HTTP transport only)
    #[arg(long)]
    tls_key: Option<PathBuf>,
    /// Log level used when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries protocol traffic in stdio mode, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let state = AppState::from_env(Arc::new(TimeResolver::default()));

    match args.transport {
        Transport::Stdio => {
            if args.tls_cert.is_some() || args.tls_key.is_some() {
                bail!("--tls-cert and --tls-key only apply to the http transport");
            }
            info!("MCP server listening on stdio");
            serve_stdio(state).await
        }
        Transport::Http => serve_http(args, state).await,
    }
}

async fn serve_http(args: Args, state: AppState) -> Result<()> {
    // Build our application with routes for both /mcp and /mcp/
    let app = Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/mcp/", post(mcp_handler))
        .with_state(state);

    let addr = args.bind;
    match (args.tls_cert, args.tls_key) {
        (Some(cert_path), Some(key_path)) => {
            let config = RustlsConfig::from_pem_file(cert_path, key_path)
                .await
                .context("failed to load TLS certificate/key")?;
            info!("MCP server listening on https://{addr}");
            axum_server::bind_rustls(addr, config)
                .serve(app.into_make_service())
                .await
                .context("failed to start HTTPS server")
        }
        (None, None) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind to address {addr}"))?;
            info!("MCP server listening on http://{addr}");
            axum::serve(listener, app)
                .await
                .context("failed to start HTTP server")
        }
        _ => bail!("both --tls-cert and --tls-key must be provided together to enable TLS"),
    }
}
