//! Client address and user agent extraction from HTTP requests.

use axum::http::{HeaderMap, header};
use std::net::{IpAddr, SocketAddr};

use crate::domain::access_event::ClientInfo;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Builds the [`ClientInfo`] attached to an access event.
///
/// The client IP is the socket peer, unless `behind_proxy` is set, in which
/// case the first `X-Forwarded-For` entry wins, then `X-Real-IP`, then the
/// peer. Enable `behind_proxy` only behind a trusted reverse proxy: the
/// headers are client-controlled otherwise.
pub fn client_info_from_request(
    headers: &HeaderMap,
    peer: SocketAddr,
    behind_proxy: bool,
) -> ClientInfo {
    let ip = if behind_proxy {
        forwarded_ip(headers).unwrap_or_else(|| peer.ip())
    } else {
        peer.ip()
    };

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    ClientInfo::new(Some(ip.to_string()), user_agent)
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let from_forwarded_for = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok());

    from_forwarded_for.or_else(|| {
        headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}
