//! Hop-by-hop header handling.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers before a message crosses to the other hop
//! - Honour headers nominated by the `Connection` header
//!
//! Each hop frames its own body; forwarding `Transfer-Encoding` or
//! `Connection` would describe a connection the peer is not on.

use axum::http::{header, HeaderMap, HeaderName};

/// Headers that only describe a single transport hop (RFC 9110 §7.6.1).
pub const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let nominated: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in nominated {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}
