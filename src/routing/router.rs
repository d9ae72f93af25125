//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store the compiled route table
//! - Look up the matching route for a request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Evaluated before any backend I/O
//! - Explicit NotFound rather than silent default

use axum::http::Method;
use std::fmt;

use super::matcher::{ExactPathMatcher, Matcher, PathPrefixMatcher};

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Streaming pipeline, `/sse` rewritten to `/api`.
    Sse,
    /// Standard pipeline, path unchanged.
    Api,
    /// Local liveness endpoint.
    Health,
    /// Nothing matched.
    NotFound,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Sse => "sse",
            Route::Api => "api",
            Route::Health => "health",
            Route::NotFound => "none",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct RouteEntry {
    matcher: Box<dyn Matcher>,
    /// Only GET and HEAD match when set.
    read_only: bool,
    route: Route,
}

/// Immutable route table. First match wins.
#[derive(Debug)]
pub struct Router {
    routes: Vec<RouteEntry>,
}

impl Router {
    /// The proxy's route table: `/sse`, `/api`, then `/health`.
    pub fn new() -> Self {
        Self {
            routes: vec![
                RouteEntry {
                    matcher: Box::new(PathPrefixMatcher::new("/sse")),
                    read_only: false,
                    route: Route::Sse,
                },
                RouteEntry {
                    matcher: Box::new(PathPrefixMatcher::new("/api")),
                    read_only: false,
                    route: Route::Api,
                },
                RouteEntry {
                    matcher: Box::new(ExactPathMatcher::new("/health")),
                    read_only: true,
                    route: Route::Health,
                },
            ],
        }
    }

    /// Find the route for a method and path.
    pub fn match_request(&self, method: &Method, path: &str) -> Route {
        self.routes
            .iter()
            .find(|entry| {
                entry.matcher.matches(path)
                    && (!entry.read_only || *method == Method::GET || *method == Method::HEAD)
            })
            .map(|entry| entry.route)
            .unwrap_or(Route::NotFound)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
