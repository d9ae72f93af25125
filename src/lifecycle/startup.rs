//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listener from validated configuration
//! - Announce where traffic is accepted and where it goes
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last, after config and subsystems are ready

use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::config::ProxyConfig;

/// Bind the configured listening socket.
pub async fn bind_listener(config: &ProxyConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind(&config.listener.bind_address).await
}

/// Log the startup banner.
pub fn log_banner(config: &ProxyConfig, local_addr: SocketAddr) {
    tracing::info!(
        local = %format!("http://localhost:{}", local_addr.port()),
        bind = %local_addr,
        target = %config.backend.target,
        allowed_origin = %config.cors.allowed_origin,
        sse_path = "/sse -> /api",
        "Proxy server running"
    );
}
