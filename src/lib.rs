//! Reverse proxy for Server-Sent Events and API traffic.
//!
//! Forwards `/sse/*` (rewritten to `/api/*`) and `/api/*` to one backend,
//! answers CORS preflights and `/health` locally, and grants cross-origin
//! access to a single configured origin.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
