//! SSE Proxy
//!
//! # Architecture Overview
//!
//! ```text
//!  Client ──▶ request id + trace ──▶ cors (preflight) ──▶ routing
//!                                                          │
//!              /health, 404 ◀─── answered locally ◀────────┤
//!                                                          ▼
//!                                              proxy::Forwarder
//!                                       Pipeline::sse │ Pipeline::api
//!                                                          │
//!  Client ◀── frame relay ◀── response transform ◀──── Backend
//! ```

use clap::Parser;
use std::path::PathBuf;

use sse_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use sse_proxy::lifecycle::{bind_listener, log_banner, spawn_signal_listener, Shutdown};
use sse_proxy::observability::{logging, metrics};
use sse_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "sse-proxy")]
#[command(about = "Reverse proxy for Server-Sent Events and API traffic", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening address, e.g. 0.0.0.0:3001.
    #[arg(long)]
    bind: Option<String>,

    /// Backend base URL, e.g. http://192.168.1.144:8000.
    #[arg(long)]
    target: Option<String>,

    /// The single origin granted cross-origin access.
    #[arg(long)]
    allowed_origin: Option<String>,

    /// Default log level when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(target) = self.target {
            config.backend.target = target;
        }
        if let Some(origin) = self.allowed_origin {
            config.cors.allowed_origin = origin;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability);
    tracing::info!("sse-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        target = %config.backend.target,
        connect_timeout_secs = config.timeouts.connect_secs,
        api_request_timeout_secs = config.timeouts.api_request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let server = HttpServer::new(config.clone())?;

    let listener = bind_listener(&config).await?;
    log_banner(&config, listener.local_addr()?);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    spawn_signal_listener(shutdown);

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
