//! Network helpers for service resolution.
//!
//! - `ports` - free port probing
//! - `local_ip` - LAN-facing address discovery (memoized)

pub mod local_ip;
pub mod ports;

pub use local_ip::{get_local_ip, is_loopback_host, select_local_ip};
pub use ports::{get_free_port, get_free_ports};
