//! Address normalization. The normalized form is the identity key of a peer.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use http::Uri;

use crate::store::PeerStoreError;

/// Normalize a peer address into its store key.
///
/// Accepted forms, tried in order:
/// - socket address (`127.0.0.1:9000`, `[::1]:9000`), canonicalized
/// - bare IP address, canonicalized
/// - URI with a non-empty host (`http://node-a:7000/x`, `node-a:7000`); the host is
///   lower-cased, a leading `www.` is dropped and any path or userinfo is ignored
pub fn normalize_addr(addr: &str) -> Result<String, PeerStoreError> {
    let invalid = || PeerStoreError::InvalidAddress(addr.to_string());

    let trimmed = addr.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    if let Ok(socket) = trimmed.parse::<SocketAddr>() {
        return Ok(socket.to_string());
    }
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Ok(ip.to_string());
    }

    normalize_uri(trimmed).ok_or_else(invalid)
}

fn normalize_uri(addr: &str) -> Option<String> {
    let uri: Uri = addr.parse().ok()?;
    let authority = uri.authority()?;

    // Userinfo is not part of the identity.
    let host_port = authority.as_str().rsplit('@').next()?;
    let (host, port) = split_host_port(host_port)?;

    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        return None;
    }

    if let Some(ip) = parse_ip_host(host) {
        return Some(match port {
            Some(port) => SocketAddr::new(ip, port).to_string(),
            None => ip.to_string(),
        });
    }

    Some(match port {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Split `host[:port]`. Returns `None` when a port is present but not a valid `u16`.
fn split_host_port(host_port: &str) -> Option<(&str, Option<u16>)> {
    if host_port.starts_with('[') {
        let end = host_port.find(']')?;
        let (host, rest) = host_port.split_at(end + 1);
        return match rest.strip_prefix(':') {
            Some(port) => Some((host, Some(port.parse().ok()?))),
            None if rest.is_empty() => Some((host, None)),
            None => None,
        };
    }

    match host_port.rsplit_once(':') {
        Some((host, _)) if host.contains(':') => None,
        Some((host, port)) => Some((host, Some(port.parse().ok()?))),
        None => Some((host_port, None)),
    }
}

fn parse_ip_host(host: &str) -> Option<IpAddr> {
    if let Some(inner) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        return inner.parse::<Ipv6Addr>().ok().map(IpAddr::V6);
    }
    host.parse().ok()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_socket_addresses() {
        assert_eq!(normalize_addr("127.0.0.1:9000").unwrap(), "127.0.0.1:9000");
        assert_eq!(normalize_addr("  127.0.0.1:9000 ").unwrap(), "127.0.0.1:9000");
        assert_eq!(normalize_addr("[::1]:9000").unwrap(), "[::1]:9000");
        assert_eq!(
            normalize_addr("[0:0:0:0:0:0:0:1]:9000").unwrap(),
            "[::1]:9000"
        );
    }

    #[test]
    fn test_bare_ip() {
        assert_eq!(normalize_addr("10.0.0.7").unwrap(), "10.0.0.7");
        assert_eq!(normalize_addr("::1").unwrap(), "::1");
    }

    #[test]
    fn test_url_forms_collapse_to_socket_key() {
        let expected = "127.0.0.1:9000";
        assert_eq!(normalize_addr("http://127.0.0.1:9000").unwrap(), expected);
        assert_eq!(normalize_addr("http://127.0.0.1:9000/peers").unwrap(), expected);
        assert_eq!(normalize_addr("http://user@127.0.0.1:9000").unwrap(), expected);
        assert_eq!(normalize_addr("http://[::1]:9000").unwrap(), "[::1]:9000");
    }

    #[test]
    fn test_hostnames() {
        assert_eq!(normalize_addr("node-a:7000").unwrap(), "node-a:7000");
        assert_eq!(normalize_addr("http://Node-A:7000").unwrap(), "node-a:7000");
        assert_eq!(
            normalize_addr("https://www.example.com:443/x").unwrap(),
            "example.com:443"
        );
        assert_eq!(normalize_addr("http://www.example.com").unwrap(), "example.com");
    }

    #[test]
    fn test_invalid() {
        for addr in [
            "",
            "   ",
            "not a valid address",
            "http://",
            "127.0.0.1:99999",
            "node-a:port",
            "[::1]x",
        ] {
            assert_matches!(
                normalize_addr(addr),
                Err(PeerStoreError::InvalidAddress(_)),
                "{addr:?} should be rejected"
            );
        }
    }
}
