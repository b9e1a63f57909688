use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Identity used for rate limiting. `X-Forwarded-For` is only believed when
/// the deployment says a trusted proxy sets it.
pub fn client_identity(request: &Request, trust_proxy_headers: bool) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    resolve_client_identity(request.headers(), peer, trust_proxy_headers)
}

pub fn resolve_client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers
        && let Some(forwarded) = headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
