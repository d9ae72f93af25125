//! The forwarding engine shared by both pipelines.

use axum::{
    body::Body,
    http::{Request, Response},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Duration;

use super::error::ForwardError;
use super::pipeline::{Pipeline, PipelineKind};
use super::stream::relay_event_stream;
use super::target::BackendTarget;
use crate::config::TimeoutConfig;
use crate::http::request::build_outbound_request;
use crate::http::response::transform_response;
use crate::security::CorsPolicy;

/// Sends requests to the configured backend and relays the responses.
///
/// Holds no per-request state; one instance is shared by every connection.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    target: BackendTarget,
    cors: Arc<CorsPolicy>,
}

impl Forwarder {
    pub fn new(target: BackendTarget, cors: Arc<CorsPolicy>, timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);
        if timeouts.tcp_keepalive_secs > 0 {
            connector.set_keepalive(Some(Duration::from_secs(timeouts.tcp_keepalive_secs)));
        }

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            target,
            cors,
        }
    }

    pub fn target(&self) -> &BackendTarget {
        &self.target
    }

    /// Forward one request through a pipeline.
    ///
    /// Exactly one outbound request is made; failures are returned, never
    /// retried.
    pub async fn forward(
        &self,
        request: Request<Body>,
        pipeline: &Pipeline,
    ) -> Result<Response<Body>, ForwardError> {
        let outbound = build_outbound_request(request, &self.target, pipeline)?;
        let path = outbound
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        match pipeline.kind() {
            PipelineKind::Sse => tracing::info!(path = %path, "Proxying SSE request"),
            PipelineKind::Api => {
                tracing::info!(method = %outbound.method(), path = %path, "Proxying API request")
            }
        }

        let pending = self.client.request(outbound);
        let response: Response<Incoming> = match pipeline.response_timeout() {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| ForwardError::Timeout(limit))??,
            None => pending.await?,
        };

        let response = transform_response(response, pipeline.kind(), &self.cors);
        let (parts, body) = response.into_parts();
        let body = match pipeline.kind() {
            PipelineKind::Sse => relay_event_stream(body, path),
            PipelineKind::Api => Body::new(body),
        };

        Ok(Response::from_parts(parts, body))
    }
}
