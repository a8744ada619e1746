//! Client identification for throttling keys.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Identifier used when no client address can be determined. Requests under
/// this identifier are always allowed, since no per-client state can be
/// tracked for them.
pub const UNKNOWN_IDENTIFIER: &str = "unknown";

const FORWARDED_FOR: &str = "x-forwarded-for";
const USER_AGENT: &str = "user-agent";

/// Resolve the throttling identifier for a request.
///
/// Prefers the last entry of the forwarded-for chain (the client as seen by
/// the nearest trusted proxy), then the observed peer address, then
/// [`UNKNOWN_IDENTIFIER`].
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get(FORWARDED_FOR) {
        if let Ok(forwarded) = forwarded.to_str() {
            if let Some(last) = forwarded.rsplit(',').next() {
                let last = last.trim();
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_IDENTIFIER.to_string(),
    }
}

/// Raw user-agent string, or `"unknown"` when the header is missing or not
/// valid UTF-8.
pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .unwrap_or(UNKNOWN_IDENTIFIER)
        .to_string()
}
