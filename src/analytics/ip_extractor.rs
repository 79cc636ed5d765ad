//! Client IP extraction from HTTP headers
//!
//! The edge (Cloudflare) injects `CF-Connecting-IP`; behind other proxies
//! `X-Real-IP` and then the left-most `X-Forwarded-For` entry are used.
//! When none are present the address is recorded as `unknown`.

use axum::http::HeaderMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::models::UNKNOWN;

const CLIENT_IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-real-ip", "x-forwarded-for"];

/// Extract the client address as observed at the edge
///
/// Header values are taken as-is (trimmed) even when they do not parse as an
/// IP address; geolocation simply skips those.
pub fn extract_client_ip(headers: &HeaderMap) -> String {
    CLIENT_IP_HEADERS
        .iter()
        .find_map(|name| {
            headers
                .get(*name)
                .and_then(|h| h.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Anonymize an IP address by truncating to network prefix
///
/// - IPv4: Truncate to /24 (zero last octet)
/// - IPv6: Truncate to /48 (zero last 80 bits)
pub fn anonymize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(addr) => {
            let octets = addr.octets();
            IpAddr::V4(Ipv4Addr::new(octets[0], octets[1], octets[2], 0))
        }
        IpAddr::V6(addr) => {
            let segments = addr.segments();
            IpAddr::V6(Ipv6Addr::new(
                segments[0],
                segments[1],
                segments[2],
                0,
                0,
                0,
                0,
                0,
            ))
        }
    }
}

/// Anonymize a recorded address; values that are not IP addresses pass through
pub fn anonymize_recorded_ip(ip: &str) -> String {
    match ip.parse::<IpAddr>() {
        Ok(addr) => anonymize_ip(addr).to_string(),
        Err(_) => ip.to_string(),
    }
}
