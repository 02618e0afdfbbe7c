//! Line-oriented sources: flat host lists and `host:port#label` lists.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use crate::models::RawRecord;
use crate::utils::string::content_lines;

lazy_static! {
    static ref STRUCTURED_LINE: Regex = Regex::new(r"^([^:]+):(\d+)#(.*)$").unwrap();
    static ref HOSTNAME: Regex =
        Regex::new(r"^[A-Za-z0-9_]([A-Za-z0-9_-]*[A-Za-z0-9_])?(\.[A-Za-z0-9_]([A-Za-z0-9_-]*[A-Za-z0-9_])?)*\.?$")
            .unwrap();
}

/// True for a literal IP address or a syntactically valid DNS name.
///
/// Ports, brackets, schemes and paths are not part of a host.
pub fn is_valid_host(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok() || (host.len() <= 253 && HOSTNAME.is_match(host))
}

/// Parse one list entry into a [`RawRecord::Line`].
///
/// Accepts a bare host, a literal IPv4/IPv6 address, `host:port`,
/// `a.b.c.d:port` and `[v6]:port`. Anything after the first whitespace is
/// ignored. Entries with an invalid port or a host that is not a DNS name
/// or IP literal yield `None`.
pub fn parse_list_line(line: &str) -> Option<RawRecord> {
    let token = line.split_whitespace().next()?;
    if token.starts_with('#') {
        return None;
    }

    if let Ok(addr) = token.parse::<SocketAddr>() {
        return Some(RawRecord::Line {
            host: addr.ip().to_string(),
            port: Some(addr.port()),
        });
    }
    if token.parse::<IpAddr>().is_ok() {
        return Some(RawRecord::Line {
            host: token.to_string(),
            port: None,
        });
    }
    if let Some(v6) = token
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .and_then(|t| t.parse::<Ipv6Addr>().ok())
    {
        return Some(RawRecord::Line {
            host: v6.to_string(),
            port: None,
        });
    }

    let (host, port) = match token.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host, Some(port)),
            Err(_) => {
                debug!("Dropping list entry with invalid port: {}", token);
                return None;
            }
        },
        None => (token, None),
    };
    // An unbracketed IPv6 address followed by a port is ambiguous.
    if !is_valid_host(host) || host.parse::<IpAddr>().map_or(false, |ip| ip.is_ipv6()) {
        debug!("Dropping malformed list entry: {}", token);
        return None;
    }

    Some(RawRecord::Line {
        host: host.to_string(),
        port,
    })
}

/// Parse a whole list body, skipping blank and `#` lines.
pub fn parse_list_body(body: &str) -> Vec<RawRecord> {
    content_lines(body).filter_map(parse_list_line).collect()
}

/// Parse a `host:port#label` line. Lines not matching the pattern yield `None`.
pub fn parse_structured_line(line: &str) -> Option<RawRecord> {
    let caps = STRUCTURED_LINE.captures(line.trim())?;
    let host = caps.get(1)?.as_str().trim();
    if host.is_empty() {
        return None;
    }
    let port = caps.get(2)?.as_str().parse::<u16>().ok()?;
    let label = caps
        .get(3)
        .map(|m| m.as_str().trim())
        .filter(|l| !l.is_empty())
        .unwrap_or(host);

    Some(RawRecord::Structured {
        host: host.to_string(),
        port,
        label: label.to_string(),
    })
}

pub fn parse_structured_body(body: &str) -> Vec<RawRecord> {
    content_lines(body)
        .filter_map(parse_structured_line)
        .collect()
}
