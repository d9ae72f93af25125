//! Forwarding errors and their client-facing responses.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

use super::pipeline::PipelineKind;

/// Why a request could not be relayed.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The rewritten URI could not be assembled.
    #[error("invalid outbound URI: {0}")]
    InvalidUri(#[from] axum::http::Error),

    /// Connecting to or talking with the backend failed.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// The backend did not answer within the pipeline's timeout.
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

impl ForwardError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::InvalidUri(_) => "invalid_uri",
            ForwardError::Upstream(e) if e.is_connect() => "connect",
            ForwardError::Upstream(_) => "upstream",
            ForwardError::Timeout(_) => "timeout",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// The gateway error sent to the client.
    ///
    /// API callers get a short text body. Event-stream callers get no
    /// content at all and the connection is closed after the status line,
    /// so an `EventSource` fails instead of parsing a bogus event.
    pub fn into_response_for(self, kind: PipelineKind) -> Response {
        match kind {
            PipelineKind::Api => {
                let message = match self {
                    ForwardError::Timeout(_) => "Upstream request timed out",
                    _ => "Upstream request failed",
                };
                (self.status(), message).into_response()
            }
            PipelineKind::Sse => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = self.status();
                response
                    .headers_mut()
                    .insert(header::CONNECTION, HeaderValue::from_static("close"));
                response
            }
        }
    }
}
