//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform backend response for client
//! - Force pipeline-specific headers, drop framing headers that no longer apply
//!
//! # Design Decisions
//! - Pure functions over the response head; no I/O, testable in isolation
//! - Hop-by-hop headers stripped before forcing new ones
//! - Event streams never advertise a length: a `Content-Length` would make
//!   clients treat the stream as a bounded body

use axum::http::{header, HeaderMap, HeaderValue, Response};

use crate::proxy::PipelineKind;
use crate::security::{strip_hop_by_hop, CorsPolicy};

/// Apply a pipeline's response rewrite. The body is left untouched.
pub fn transform_response<B>(
    mut response: Response<B>,
    kind: PipelineKind,
    cors: &CorsPolicy,
) -> Response<B> {
    let headers = response.headers_mut();
    match kind {
        PipelineKind::Sse => rewrite_sse_headers(headers, cors),
        PipelineKind::Api => rewrite_api_headers(headers, cors),
    }
    response
}

/// Event-stream rewrite, applied whatever the backend sent.
pub fn rewrite_sse_headers(headers: &mut HeaderMap, cors: &CorsPolicy) {
    strip_hop_by_hop(headers);
    headers.remove(header::CONTENT_LENGTH);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    cors.apply(headers);
}

/// Standard rewrite: only the CORS headers are forced.
pub fn rewrite_api_headers(headers: &mut HeaderMap, cors: &CorsPolicy) {
    strip_hop_by_hop(headers);
    cors.apply(headers);
}
