//! Same-host equivalence for origin addresses.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{debug, warn};

use msghub_core::config::HubConfig;

/// Addresses that identify this host, used to decide whether two origin
/// addresses refer to the same machine.
#[derive(Debug, Clone, Default)]
pub struct LocalHost {
    /// Non-loopback addresses bound to this host.
    addresses: HashSet<IpAddr>,
}

impl LocalHost {
    /// Creates a host identity from explicit interface addresses.
    pub fn new<I>(addresses: I) -> Self
    where
        I: IntoIterator<Item = IpAddr>,
    {
        Self {
            addresses: addresses.into_iter().map(|ip| ip.to_canonical()).collect(),
        }
    }

    /// Builds the host identity from configuration.
    ///
    /// Configured `local_addresses` are always included. When discovery is
    /// enabled every non-loopback address on every interface is added.
    pub fn from_config(config: &HubConfig) -> Self {
        let mut addresses = HashSet::new();
        for raw in &config.local_addresses {
            match parse_address(raw) {
                Some(ip) => {
                    addresses.insert(ip);
                }
                None => warn!(address = %raw, "Ignoring unparseable local address"),
            }
        }

        if config.discover_local_addresses {
            addresses.extend(interface_addresses());
        }

        debug!(addresses = ?addresses, "Local host addresses resolved");
        Self { addresses }
    }

    /// Whether `ip` is one of this host's interface addresses.
    pub fn is_local(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        ip.is_loopback() || self.addresses.contains(&ip)
    }

    /// Loopback-aware host equivalence.
    ///
    /// Identical addresses match; two loopback addresses match; a loopback
    /// address matches any of this host's interface addresses.
    pub fn is_same_host(&self, a: &str, b: &str) -> bool {
        if a.trim().eq_ignore_ascii_case(b.trim()) {
            return true;
        }
        let (Some(x), Some(y)) = (parse_address(a), parse_address(b)) else {
            return false;
        };
        if x == y {
            return true;
        }
        match (x.is_loopback(), y.is_loopback()) {
            (true, true) => true,
            (true, false) => self.is_local(y),
            (false, true) => self.is_local(x),
            (false, false) => false,
        }
    }
}

/// Parses a bare IP, a socket address, a bracketed IPv6 address, or
/// `localhost`. IPv4-mapped IPv6 addresses are canonicalized to IPv4 and
/// IPv6 zone indices are dropped.
pub fn parse_address(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("localhost") {
        return Some(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    if let Ok(ip) = raw.parse::<IpAddr>() {
        return Some(ip.to_canonical());
    }
    if let Some(ip) = raw
        .split_once('%')
        .and_then(|(ip, _zone)| ip.parse::<Ipv6Addr>().ok())
    {
        return Some(IpAddr::V6(ip).to_canonical());
    }
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Some(addr.ip().to_canonical());
    }
    raw.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|inner| inner.parse::<Ipv6Addr>().ok())
        .map(|ip| IpAddr::V6(ip).to_canonical())
}

/// Non-loopback addresses of every network interface on this host.
pub fn interface_addresses() -> Vec<IpAddr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces
            .iter()
            .filter(|iface| !iface.is_loopback())
            .map(|iface| iface.ip().to_canonical())
            .filter(|ip| !ip.is_unspecified())
            .collect(),
        Err(e) => {
            warn!(error = %e, "Failed to enumerate network interfaces");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> LocalHost {
        LocalHost::new(["192.168.1.20".parse().expect("ip")])
    }

    #[test]
    fn test_parse_forms() {
        let v4: IpAddr = "10.0.0.1".parse().expect("ip");
        assert_eq!(parse_address("10.0.0.1"), Some(v4));
        assert_eq!(parse_address("10.0.0.1:5000"), Some(v4));
        assert_eq!(parse_address("::ffff:10.0.0.1"), Some(v4));
        assert_eq!(
            parse_address("[::1]"),
            Some(IpAddr::V6(Ipv6Addr::LOCALHOST))
        );
        assert_eq!(
            parse_address("localhost"),
            Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
        );
        assert_eq!(parse_address("not-an-address"), None);
    }

    #[test]
    fn test_loopbacks_are_same_host() {
        let host = LocalHost::default();
        assert!(host.is_same_host("127.0.0.1", "::1"));
        assert!(host.is_same_host("127.0.0.1", "127.0.1.1"));
        assert!(host.is_same_host("localhost", "127.0.0.1:8080"));
    }

    #[test]
    fn test_loopback_matches_local_interface() {
        let host = host();
        assert!(host.is_same_host("127.0.0.1", "192.168.1.20"));
        assert!(host.is_same_host("192.168.1.20:4411", "::1"));
    }

    #[test]
    fn test_loopback_does_not_match_remote() {
        let host = host();
        assert!(!host.is_same_host("127.0.0.1", "192.168.1.21"));
    }

    #[test]
    fn test_distinct_remote_hosts() {
        let host = host();
        assert!(host.is_same_host("10.1.1.1", "10.1.1.1:9000"));
        assert!(!host.is_same_host("10.1.1.1", "10.1.1.2"));
        assert!(!host.is_same_host("192.168.1.20", "10.1.1.2"));
    }

    #[test]
    fn test_secondary_interface_matches_loopback() {
        let host = LocalHost::new([
            "192.168.1.20".parse().expect("ip"),
            "172.17.0.1".parse().expect("ip"),
            "fe80::fc:ff:fe00:1".parse().expect("ip"),
        ]);
        assert!(host.is_same_host("127.0.0.1", "172.17.0.1"));
        assert!(host.is_same_host("::1", "fe80::fc:ff:fe00:1"));
        assert!(host.is_same_host("127.0.0.1", "fe80::fc:ff:fe00:1%eth0"));
        assert!(!host.is_same_host("127.0.0.1", "fe80::fc:ff:fe00:2"));
    }

    #[test]
    fn test_discovery_includes_every_interface() {
        let config = HubConfig {
            local_addresses: vec!["172.16.0.9".to_string()],
            discover_local_addresses: true,
            ..HubConfig::default()
        };
        let host = LocalHost::from_config(&config);
        assert!(host.is_local("172.16.0.9".parse().expect("ip")));
        for ip in interface_addresses() {
            assert!(host.is_same_host("127.0.0.1", &ip.to_string()), "{ip}");
        }
    }

    #[test]
    fn test_configured_addresses_are_local() {
        let config = HubConfig {
            local_addresses: vec!["172.16.0.9".to_string(), "bogus".to_string()],
            discover_local_addresses: false,
            ..HubConfig::default()
        };
        let host = LocalHost::from_config(&config);
        assert!(host.is_local("172.16.0.9".parse().expect("ip")));
        assert!(host.is_same_host("::1", "172.16.0.9"));
    }
}
