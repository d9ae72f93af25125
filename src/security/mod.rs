//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (preflight short-circuit, allow headers on the way out)
//!     → headers.rs (strip hop-by-hop headers in both directions)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - The origin policy never validates preflight contents; it answers uniformly
//! - Access is granted to exactly one origin; enforcement is left to browsers

pub mod cors;
pub mod headers;

pub use cors::{cors_middleware, CorsPolicy};
pub use headers::strip_hop_by_hop;
