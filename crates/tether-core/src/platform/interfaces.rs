//! Network interface enumeration.

use crate::error::{Result, TetherError};
use std::net::Ipv4Addr;

/// One IPv4 address bound to a named interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    /// Interface name (`en0`, `eth0`, `Wi-Fi`, ...).
    pub name: String,
    /// IPv4 address assigned to the interface.
    pub address: Ipv4Addr,
    /// Whether this is a loopback/internal interface.
    pub internal: bool,
}

/// List every IPv4 address of every interface, in enumeration order.
///
/// # Platform Behavior
/// - **Linux/macOS**: Uses `getifaddrs`
/// - **Other**: Not supported; returns an error so callers fall back
pub fn ipv4_interfaces() -> Result<Vec<InterfaceAddress>> {
    #[cfg(unix)]
    {
        use nix::ifaddrs::getifaddrs;
        use nix::net::if_::InterfaceFlags;

        let addrs = getifaddrs()
            .map_err(|e| TetherError::Other(format!("Failed to enumerate interfaces: {}", e)))?;

        let interfaces = addrs
            .filter_map(|ifaddr| {
                let address = ifaddr.address.as_ref()?.as_sockaddr_in()?.ip();
                Some(InterfaceAddress {
                    internal: ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK)
                        || address.is_loopback(),
                    name: ifaddr.interface_name,
                    address,
                })
            })
            .collect();

        Ok(interfaces)
    }

    #[cfg(not(unix))]
    {
        Err(TetherError::Other(
            "Interface enumeration not implemented for this platform".into(),
        ))
    }
}
