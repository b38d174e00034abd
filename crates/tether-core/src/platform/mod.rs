//! Platform abstraction layer for cross-platform compatibility.
//!
//! All `#[cfg]` blocks for OS-specific behavior live in this module rather
//! than being scattered through the resolver and the supervisor.
//!
//! # Architecture
//!
//! - `interfaces` - Network interface enumeration
//! - `paths` - Executable suffixes, interpreter and shell commands
//! - `process` - Process signalling (terminate, kill, liveness)

pub mod interfaces;
pub mod paths;
pub mod process;

pub use interfaces::{ipv4_interfaces, InterfaceAddress};
pub use paths::{apply_executable_suffix, executable_fallback, python_command, shell_command};
pub use process::{force_kill, is_process_alive, send_terminate};

/// Returns the current platform name.
pub fn current_platform() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "linux"
    }
    #[cfg(target_os = "windows")]
    {
        "windows"
    }
    #[cfg(target_os = "macos")]
    {
        "macos"
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        "unknown"
    }
}

/// Check whether a user-facing platform key refers to the current platform.
///
/// Accepts the names used in per-platform build tables (`mac`, `darwin`,
/// `win32`, ...).
pub fn matches_platform_key(key: &str) -> bool {
    let normalized = match key.to_ascii_lowercase().as_str() {
        "mac" | "macos" | "darwin" | "osx" => "macos",
        "windows" | "win" | "win32" => "windows",
        "linux" => "linux",
        _ => return false,
    };
    normalized == current_platform()
}
