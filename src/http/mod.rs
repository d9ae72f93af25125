//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, CORS, dispatch)
//!     → request.rs (request ID, outbound request construction)
//!     → [proxy::Forwarder sends it to the backend]
//!     → response.rs (transform, force headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{build_outbound_request, MakeRequestUuid, X_REQUEST_ID};
pub use response::transform_response;
pub use server::HttpServer;
