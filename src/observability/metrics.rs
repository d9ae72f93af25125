//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by pipeline and status
//! - `proxy_request_duration_seconds` (histogram): time to response head
//! - `proxy_upstream_errors_total` (counter): backend failures by kind
//! - `proxy_sse_streams_active` (gauge): open event streams
//! - `proxy_sse_bytes_total` (counter): bytes relayed on event streams
//!
//! Recording is a no-op until an exporter is installed.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(pipeline: &'static str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "pipeline" => pipeline,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "pipeline" => pipeline)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(pipeline: &'static str, kind: &'static str) {
    counter!("proxy_upstream_errors_total", "pipeline" => pipeline, "kind" => kind).increment(1);
}

pub fn sse_stream_opened() {
    gauge!("proxy_sse_streams_active").increment(1.0);
}

pub fn sse_stream_closed() {
    gauge!("proxy_sse_streams_active").decrement(1.0);
}

pub fn record_sse_bytes(bytes: u64) {
    counter!("proxy_sse_bytes_total").increment(bytes);
}
