//! Event-stream body relay.
//!
//! Frames from the backend are handed to the client one by one, as they
//! arrive. Dropping the returned body (client went away) drops the backend
//! body with it, which closes that backend connection.

use axum::body::Body;
use futures_util::StreamExt;
use std::time::Instant;

use crate::observability::metrics;

/// Lives as long as one relayed event stream.
#[derive(Debug)]
struct StreamGuard {
    path: String,
    opened_at: Instant,
    bytes: u64,
    chunks: u64,
    failed: bool,
}

impl StreamGuard {
    fn open(path: String) -> Self {
        metrics::sse_stream_opened();
        tracing::info!(path = %path, "SSE stream opened");
        Self {
            path,
            opened_at: Instant::now(),
            bytes: 0,
            chunks: 0,
            failed: false,
        }
    }

    fn record(&mut self, len: usize) {
        self.bytes += len as u64;
        self.chunks += 1;
        metrics::record_sse_bytes(len as u64);
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        metrics::sse_stream_closed();
        tracing::info!(
            path = %self.path,
            bytes = self.bytes,
            chunks = self.chunks,
            failed = self.failed,
            duration_ms = self.opened_at.elapsed().as_millis() as u64,
            "SSE stream closed"
        );
    }
}

/// Wrap a backend body so it is relayed frame by frame and accounted for.
pub fn relay_event_stream<B>(body: B, path: String) -> Body
where
    B: axum::body::HttpBody<Data = axum::body::Bytes> + Send + 'static,
    B::Error: Into<axum::BoxError>,
{
    let mut guard = StreamGuard::open(path);
    let frames = Body::new(body).into_data_stream().map(move |frame| {
        match &frame {
            Ok(bytes) => guard.record(bytes.len()),
            Err(e) => {
                guard.failed = true;
                tracing::warn!(path = %guard.path, error = %e, "SSE upstream stream failed");
            }
        }
        frame
    });
    Body::from_stream(frames)
}
