//! Destination URL validation.

use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Longest destination URL accepted.
pub const MAX_ORIGIN_LENGTH: usize = 2048;

/// Errors that can occur while validating a destination URL.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OriginError {
    #[error("URL must not be empty")]
    Empty,

    #[error("URL must be at most {MAX_ORIGIN_LENGTH} characters")]
    TooLong,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must include a host")]
    MissingHost,

    #[error("Local and private network hosts are not allowed")]
    PrivateHost,

    #[error("URL must not contain credentials")]
    Credentials,
}

/// Checks that `input` is an absolute http(s) URL and returns it trimmed.
///
/// The URL is stored as given. Its code is derived from this exact string,
/// so rewriting it here would change which code an origin maps to.
///
/// Rejects `javascript:`, `data:`, `file:` and every other non-web scheme,
/// hosts on loopback or private networks, and embedded credentials.
pub fn validate_origin(input: &str) -> Result<String, OriginError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(OriginError::Empty);
    }
    if trimmed.chars().count() > MAX_ORIGIN_LENGTH {
        return Err(OriginError::TooLong);
    }

    let url = Url::parse(trimmed).map_err(|e| OriginError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(OriginError::UnsupportedProtocol),
    }

    match url.host() {
        None => return Err(OriginError::MissingHost),
        Some(Host::Domain(domain)) if domain.is_empty() => {
            return Err(OriginError::MissingHost);
        }
        Some(host) if is_private_host(&host) => return Err(OriginError::PrivateHost),
        Some(_) => {}
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(OriginError::Credentials);
    }

    Ok(trimmed.to_string())
}

fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
        Host::Ipv4(ip) => is_private_v4(ip),
        Host::Ipv6(ip) => is_private_v6(ip),
    }
}

fn is_private_v4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private()
}

fn is_private_v6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    // fc00::/7 unique local, fe80::/10 link local
    ip.is_loopback() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}
