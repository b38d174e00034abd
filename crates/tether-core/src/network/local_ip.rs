//! LAN-facing address discovery.
//!
//! Mobile devices on the same network cannot reach `localhost` services on the
//! development host, so loopback hosts are rewritten to this address.

use crate::config::ServiceConfig;
use crate::platform::{ipv4_interfaces, InterfaceAddress};
use std::net::IpAddr;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Interface names treated as the primary adapter, in order of preference.
const PREFERRED_INTERFACES: &[&str] = &["en0", "Wi-Fi", "eth0", "wlan0", "Ethernet"];

static LOCAL_IP: OnceLock<String> = OnceLock::new();

/// Get the host's LAN-facing IPv4 address, computed once per process.
///
/// Falls back to `localhost` when no external interface qualifies or
/// enumeration fails.
pub fn get_local_ip() -> String {
    LOCAL_IP
        .get_or_init(|| match ipv4_interfaces() {
            Ok(interfaces) => {
                let ip = select_local_ip(&interfaces);
                debug!("Resolved local network address: {}", ip);
                ip
            }
            Err(e) => {
                warn!("Falling back to localhost, interface lookup failed: {}", e);
                ServiceConfig::DEFAULT_HOST.to_string()
            }
        })
        .clone()
}

/// Pick the LAN address from an interface listing.
///
/// Preferred adapter names win; otherwise the first external interface is
/// used.
pub fn select_local_ip(interfaces: &[InterfaceAddress]) -> String {
    let external: Vec<&InterfaceAddress> = interfaces.iter().filter(|i| !i.internal).collect();

    PREFERRED_INTERFACES
        .iter()
        .find_map(|name| external.iter().find(|i| i.name == *name))
        .or_else(|| external.first())
        .map(|i| i.address.to_string())
        .unwrap_or_else(|| ServiceConfig::DEFAULT_HOST.to_string())
}

/// Whether a host string refers to the local loopback.
pub fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn iface(name: &str, address: [u8; 4], internal: bool) -> InterfaceAddress {
        InterfaceAddress {
            name: name.to_string(),
            address: Ipv4Addr::from(address),
            internal,
        }
    }

    #[test]
    fn test_prefers_primary_adapter() {
        let interfaces = vec![
            iface("lo", [127, 0, 0, 1], true),
            iface("docker0", [172, 17, 0, 1], false),
            iface("en0", [192, 168, 1, 20], false),
        ];
        assert_eq!(select_local_ip(&interfaces), "192.168.1.20");
    }

    #[test]
    fn test_falls_back_to_first_external() {
        let interfaces = vec![
            iface("lo", [127, 0, 0, 1], true),
            iface("enp3s0", [10, 0, 0, 5], false),
            iface("docker0", [172, 17, 0, 1], false),
        ];
        assert_eq!(select_local_ip(&interfaces), "10.0.0.5");
    }

    #[test]
    fn test_falls_back_to_localhost() {
        let interfaces = vec![iface("lo", [127, 0, 0, 1], true)];
        assert_eq!(select_local_ip(&interfaces), "localhost");
        assert_eq!(select_local_ip(&[]), "localhost");
    }

    #[test]
    fn test_local_ip_is_memoized() {
        assert_eq!(get_local_ip(), get_local_ip());
    }

    #[test]
    fn test_loopback_hosts() {
        assert!(is_loopback_host("localhost"));
        assert!(is_loopback_host("127.0.0.1"));
        assert!(is_loopback_host("[::1]"));
        assert!(!is_loopback_host("0.0.0.0"));
        assert!(!is_loopback_host("192.168.1.20"));
        assert!(!is_loopback_host("api.example.com"));
    }
}
