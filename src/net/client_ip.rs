//! Client key derivation.
//!
//! # Responsibilities
//! - Pick the best-effort client IP for rate limiting
//! - Fall back to the literal "unknown" when nothing is available
//!
//! Priority: `cf-connecting-ip`, `x-real-ip`, first entry of
//! `x-forwarded-for`, socket peer address, then "unknown".
//!
//! # Design Decisions
//! - No validation or normalization: the value is used verbatim as a key
//! - Every client without a derivable IP shares the "unknown" bucket

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;

pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Key used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Rate-limit key for the calling client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl ClientKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the client key from request headers and the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header(CF_CONNECTING_IP) {
        return ip.to_string();
    }
    if let Some(ip) = header(X_REAL_IP) {
        return ip.to_string();
    }
    if let Some(first) = header(X_FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientKey(client_key(&parts.headers, peer)))
    }
}
