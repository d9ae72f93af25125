//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: Sse | Api | Health | NotFound
//! ```
//!
//! # Design Decisions
//! - The table is fixed: `/sse`, `/api`, `/health`
//! - Prefixes match whole path segments, so `/ssex` is not `/sse`
//! - Evaluated before any backend I/O; unmatched paths never leave the proxy

pub mod matcher;
pub mod router;

pub use router::{Route, Router};
