//! Platform-specific process signalling.
//!
//! The supervisor owns its children through tokio handles; these helpers only
//! deliver signals by pid so a close request never has to wait on the handle.

use crate::error::{Result, TetherError};
use tracing::{debug, warn};

/// Check if a process with the given PID is alive.
///
/// # Platform Behavior
/// - **Linux/macOS**: Uses `kill(pid, 0)` signal check
/// - **Other**: Assumes the process exists
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        kill(Pid::from_raw(raw), None).is_ok()
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}

/// Ask a process to terminate.
///
/// # Platform Behavior
/// - **Linux/macOS**: Sends SIGTERM
/// - **Other**: Not supported; returns `Ok(false)` so callers fall back to
///   killing through the child handle
///
/// # Returns
/// `true` if the signal was delivered or the process was already gone.
pub fn send_terminate(pid: u32) -> Result<bool> {
    #[cfg(unix)]
    {
        use nix::sys::signal::Signal;
        signal_unix(pid, Signal::SIGTERM)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Ok(false)
    }
}

/// Kill a process forcefully.
///
/// # Platform Behavior
/// - **Linux/macOS**: Sends SIGKILL
/// - **Other**: Not supported; returns `Ok(false)`
pub fn force_kill(pid: u32) -> Result<bool> {
    #[cfg(unix)]
    {
        use nix::sys::signal::Signal;
        signal_unix(pid, Signal::SIGKILL)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Ok(false)
    }
}

#[cfg(unix)]
fn signal_unix(pid: u32, signal: nix::sys::signal::Signal) -> Result<bool> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| TetherError::Other(format!("PID {} out of range", pid)))?;

    debug!("Sending {} to process {}", signal, pid);
    match kill(Pid::from_raw(raw), signal) {
        Ok(()) => Ok(true),
        Err(nix::errno::Errno::ESRCH) => {
            debug!("Process {} is not running", pid);
            Ok(true)
        }
        Err(e) => {
            warn!("Failed to send {} to {}: {}", signal, pid, e);
            Err(TetherError::Other(format!(
                "Failed to signal process {}: {}",
                pid, e
            )))
        }
    }
}
