//! Free port allocation.
//!
//! Ports are probed by binding ephemeral listeners and released before
//! returning. Another process may claim a port between the probe and the
//! caller's own bind; that window is not retried.

use crate::error::{Result, TetherError};
use tokio::net::TcpListener;
use tracing::debug;

/// Obtain `n` pairwise-distinct ports that were unbound at probe time.
pub async fn get_free_ports(n: usize) -> Result<Vec<u16>> {
    let mut listeners = Vec::with_capacity(n);

    // Every listener stays open until all ports are read so the OS cannot
    // hand out the same port twice within one call.
    for _ in 0..n {
        let listener = TcpListener::bind(("0.0.0.0", 0))
            .await
            .map_err(|e| TetherError::PortAllocation {
                message: e.to_string(),
                source: Some(e),
            })?;
        listeners.push(listener);
    }

    let ports = listeners
        .iter()
        .map(|listener| {
            listener
                .local_addr()
                .map(|addr| addr.port())
                .map_err(|e| TetherError::PortAllocation {
                    message: e.to_string(),
                    source: Some(e),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    drop(listeners);
    debug!("Allocated free ports {:?}", ports);

    Ok(ports)
}

/// Obtain a single free port.
pub async fn get_free_port() -> Result<u16> {
    get_free_ports(1)
        .await?
        .pop()
        .ok_or_else(|| TetherError::PortAllocation {
            message: "no port returned".to_string(),
            source: None,
        })
}
