//! DNS server address parsing.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Standard DNS port, used when an address omits one.
pub const DNS_PORT: u16 = 53;

/// Parse a DNS server address.
///
/// Accepted formats:
/// - `8.8.8.8` - port defaults to 53
/// - `8.8.8.8:5353`
/// - `[2001:4860:4860::8888]` - port defaults to 53
/// - `[2001:4860:4860::8888]:5353`
pub fn parse_server_addr(s: &str) -> Result<SocketAddr> {
    let s = s.trim();

    if let Ok(addr) = SocketAddr::from_str(s) {
        return Ok(addr);
    }

    // Bare IP, v4 or bracketed v6 without a port.
    let ip_str = s
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(s);
    if let Ok(ip) = ip_str.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DNS_PORT));
    }

    Err(Error::Config(format!(
        "cannot parse DNS server address '{s}'"
    )))
}
