//! Forwarding pipeline configurations.
//!
//! The SSE and API routes run through the same forwarder; a `Pipeline`
//! captures everything that differs between them.

use axum::http::{header, HeaderMap, HeaderValue};
use std::fmt;
use std::time::Duration;

/// Which pipeline a request runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Sse,
    Api,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Sse => "sse",
            PipelineKind::Api => "api",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replaces a leading path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewrite {
    from: String,
    to: String,
}

impl PathRewrite {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Rewrite a path-and-query, or `None` when the prefix does not apply.
    ///
    /// The prefix only matches at a segment boundary, and the query string is
    /// carried over untouched.
    pub fn apply(&self, path_and_query: &str) -> Option<String> {
        let rest = path_and_query.strip_prefix(&self.from)?;
        if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')) {
            return None;
        }
        Some(format!("{}{}", self.to, rest))
    }
}

/// One configuration of the forwarder.
#[derive(Debug, Clone)]
pub struct Pipeline {
    kind: PipelineKind,
    rewrite: Option<PathRewrite>,
    forced_request_headers: HeaderMap,
    response_timeout: Option<Duration>,
}

impl Pipeline {
    /// Streaming pipeline: `/sse` → `/api`, event-stream request headers,
    /// and no timeout once connected.
    pub fn sse() -> Self {
        let mut forced = HeaderMap::new();
        forced.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));
        forced.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        forced.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        Self {
            kind: PipelineKind::Sse,
            rewrite: Some(PathRewrite::new("/sse", "/api")),
            forced_request_headers: forced,
            response_timeout: None,
        }
    }

    /// Standard pipeline: path and headers pass through, the wait for the
    /// response head is bounded.
    pub fn api(response_timeout: Duration) -> Self {
        Self {
            kind: PipelineKind::Api,
            rewrite: None,
            forced_request_headers: HeaderMap::new(),
            response_timeout: Some(response_timeout),
        }
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn forced_request_headers(&self) -> &HeaderMap {
        &self.forced_request_headers
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout
    }

    /// The outbound path-and-query for an inbound one.
    pub fn outbound_path(&self, path_and_query: &str) -> String {
        self.rewrite
            .as_ref()
            .and_then(|rewrite| rewrite.apply(path_and_query))
            .unwrap_or_else(|| path_and_query.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_rewrite_substitutes_prefix() {
        let pipeline = Pipeline::sse();
        assert_eq!(pipeline.outbound_path("/sse/events"), "/api/events");
        assert_eq!(pipeline.outbound_path("/sse/jobs/7/stream"), "/api/jobs/7/stream");
        assert_eq!(pipeline.outbound_path("/sse"), "/api");
        assert_eq!(pipeline.outbound_path("/sse?job=7"), "/api?job=7");
        assert_eq!(pipeline.outbound_path("/sse/events?job=7&x=/sse"), "/api/events?job=7&x=/sse");
    }

    #[test]
    fn test_rewrite_respects_segment_boundary() {
        let rewrite = PathRewrite::new("/sse", "/api");
        assert_eq!(rewrite.apply("/ssex/events"), None);
        assert_eq!(rewrite.apply("/api/sse"), None);
    }

    #[test]
    fn test_api_path_unchanged() {
        let pipeline = Pipeline::api(Duration::from_secs(30));
        assert_eq!(pipeline.outbound_path("/api/jobs?page=2"), "/api/jobs?page=2");
        assert_eq!(pipeline.response_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_sse_has_no_response_timeout() {
        let pipeline = Pipeline::sse();
        assert_eq!(pipeline.kind(), PipelineKind::Sse);
        assert_eq!(pipeline.response_timeout(), None);
        assert_eq!(
            pipeline.forced_request_headers()[header::ACCEPT],
            "text/event-stream"
        );
    }
}
