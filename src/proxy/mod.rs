//! Forwarding core.
//!
//! # Data Flow
//! ```text
//! Inbound request + Pipeline
//!     → http/request.rs (path rewrite, header normalization, host swap)
//!     → forwarder.rs (single backend call, connect timeout, optional response timeout)
//!     → http/response.rs (pure header transform)
//!     → stream.rs (frame-by-frame relay for event streams)
//!     → Client response
//! ```
//!
//! # Design Decisions
//! - One function, two configurations: SSE and API differ only in `Pipeline`
//! - No retries, no queueing: one inbound request, at most one outbound
//! - Event streams have no timeout once the backend has answered

pub mod error;
pub mod forwarder;
pub mod pipeline;
pub mod stream;
pub mod target;

pub use error::ForwardError;
pub use forwarder::Forwarder;
pub use pipeline::{PathRewrite, Pipeline, PipelineKind};
pub use target::BackendTarget;
