//! Rate limiting keyed by client IP
//!
//! The key is the peer address. Behind a reverse proxy, X-Forwarded-For,
//! Forwarded and X-Real-IP can be honored instead, but only when configured
//! and only when the header value parses as an IP address.

use axum::extract::ConnectInfo;
use axum::http::Request;
use std::net::{IpAddr, SocketAddr};
use tower_governor::{key_extractor::KeyExtractor, GovernorError};

/// Client IP key extractor for `tower_governor`
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIpKeyExtractor {
    trust_forwarded_headers: bool,
}

impl ClientIpKeyExtractor {
    pub fn new(trust_forwarded_headers: bool) -> Self {
        Self {
            trust_forwarded_headers,
        }
    }

    pub fn client_ip<T>(&self, req: &Request<T>) -> Option<IpAddr> {
        if self.trust_forwarded_headers {
            if let Some(ip) = forwarded_ip(req) {
                return Some(ip);
            }
        }
        peer_ip(req)
    }
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        self.client_ip(req).ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Peer address of a request, for logging
pub fn request_client_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    peer_ip(req)
}

fn peer_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .or_else(|| req.extensions().get::<SocketAddr>().map(SocketAddr::ip))
}

fn forwarded_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());

    // X-Forwarded-For can contain multiple IPs; the first is the client
    if let Some(ip) = header("X-Forwarded-For")
        .and_then(|value| value.split(',').next())
        .and_then(parse_ip)
    {
        return Some(ip);
    }

    // Forwarded (RFC 7239): "for=192.0.2.60;proto=http;by=203.0.113.43"
    if let Some(ip) = header("Forwarded").and_then(|value| {
        value
            .split([';', ','])
            .filter_map(|part| part.trim().strip_prefix("for="))
            .find_map(parse_ip)
    }) {
        return Some(ip);
    }

    header("X-Real-IP").and_then(parse_ip)
}

/// Parse a bare or bracketed/quoted IP, optionally with a port
fn parse_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim().trim_matches('"');
    if let Ok(ip) = raw.parse() {
        return Some(ip);
    }
    raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()).or_else(|| {
        raw.strip_prefix('[')
            .and_then(|rest| rest.split(']').next())
            .and_then(|ip| ip.parse().ok())
    })
}
