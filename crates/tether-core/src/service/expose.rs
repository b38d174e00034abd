//! LAN exposure for sharing services with other devices.

use super::resolved::ResolvedMap;
use crate::network::get_local_ip;
use tracing::debug;

/// Mark every local service public and point it at the LAN address.
///
/// Remote services are left untouched.
pub fn expose_on_lan(services: &mut ResolvedMap) {
    let ip = get_local_ip();
    for (name, service) in services.iter_mut() {
        if let Some(local) = service.as_local_mut() {
            local.public = true;
            local.set_host(ip.clone());
            debug!("Exposing service {} at {}", name, local.url);
        }
    }
}
