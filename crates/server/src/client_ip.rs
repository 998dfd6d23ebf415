//! Determines which address a forwarded request originates from.

use std::net::{IpAddr, SocketAddr};

use config::ClientIpConfig;
use http::HeaderMap;

/// The client address of a request, in canonical form.
///
/// Headers are only consulted when enabled, and values that do not parse as an address
/// fall through to the next source. The TCP peer is the last resort.
pub(crate) fn extract_client_ip(config: &ClientIpConfig, headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    if config.x_real_ip
        && let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip.to_canonical();
    }

    if config.x_forwarded_for
        && let Some(value) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok())
    {
        let entry = match config.trusted_hops {
            Some(hops) => value.split(',').rev().nth(hops),
            None => value.split(',').next(),
        };

        if let Some(ip) = entry.and_then(|s| s.trim().parse::<IpAddr>().ok()) {
            return ip.to_canonical();
        }
    }

    peer.ip().to_canonical()
}
