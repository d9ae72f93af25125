//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) when the caller sent none
//! - Prepare request for forwarding to backend: path rewrite, header
//!   normalization, destination swap
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Inbound body is streamed to the backend, never buffered
//! - `Host` is rewritten to the backend authority

use axum::{
    body::Body,
    http::{header, HeaderName, Request, Uri, Version},
};
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::proxy::{BackendTarget, ForwardError, Pipeline};
use crate::security::strip_hop_by_hop;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates v4 UUID request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// Derive the outbound request from an inbound one.
///
/// - the path prefix is rewritten per the pipeline
/// - hop-by-hop headers are dropped, everything else passes through
/// - `Host` names the backend
/// - the pipeline's forced headers override whatever the client sent
pub fn build_outbound_request(
    request: Request<Body>,
    target: &BackendTarget,
    pipeline: &Pipeline,
) -> Result<Request<Body>, ForwardError> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri = Uri::builder()
        .scheme(target.scheme().clone())
        .authority(target.authority().clone())
        .path_and_query(pipeline.outbound_path(path_and_query))
        .build()?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.insert(header::HOST, target.host_header().clone());
    for (name, value) in pipeline.forced_request_headers() {
        headers.insert(name.clone(), value.clone());
    }

    let mut outbound = Request::builder()
        .method(parts.method)
        .uri(uri)
        .version(Version::HTTP_11)
        .body(body)?;
    *outbound.headers_mut() = headers;
    Ok(outbound)
}
