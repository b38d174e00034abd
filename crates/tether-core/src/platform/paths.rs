//! Platform-specific path and command utilities.

use crate::config::ServiceConfig;
use std::path::{Path, PathBuf};

/// Normalize the executable suffix of a service artifact.
///
/// # Platform Behavior
/// - **Windows**: appends `.exe` when the file name has no extension
/// - **Linux/macOS**: strips a trailing `.exe`
pub fn apply_executable_suffix(path: &Path) -> PathBuf {
    let ext = path.extension().and_then(|e| e.to_str());

    if cfg!(windows) {
        if ext.is_none() {
            return append_extension(path, ServiceConfig::EXECUTABLE_EXTENSION);
        }
    } else if ext == Some(ServiceConfig::EXECUTABLE_EXTENSION) {
        return path.with_extension("");
    }

    path.to_path_buf()
}

/// Resolve the file that should actually be executed for `path`.
///
/// Extension-less paths fall back to `<path>.exe` when only that exists.
pub fn executable_fallback(path: &Path) -> PathBuf {
    if path.extension().is_none() && !path.exists() {
        let candidate = append_extension(path, ServiceConfig::EXECUTABLE_EXTENSION);
        if candidate.exists() {
            return candidate;
        }
    }
    path.to_path_buf()
}

/// Get the Python interpreter command.
///
/// # Platform Behavior
/// - **Linux/macOS**: `python3`
/// - **Windows**: `python`
pub fn python_command() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

/// Split a shell command line into the platform shell invocation.
///
/// # Platform Behavior
/// - **Linux/macOS**: `sh -c <command>`
/// - **Windows**: `cmd /C <command>`
pub fn shell_command(command: &str) -> (&'static str, Vec<String>) {
    if cfg!(windows) {
        ("cmd", vec!["/C".to_string(), command.to_string()])
    } else {
        ("sh", vec!["-c".to_string(), command.to_string()])
    }
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_executable_suffix() {
        let bare = apply_executable_suffix(Path::new("/srv/.tether/services/api/api"));
        let exe = apply_executable_suffix(Path::new("/srv/build/server.exe"));
        let script = apply_executable_suffix(Path::new("/srv/server.js"));

        #[cfg(windows)]
        {
            assert_eq!(bare, PathBuf::from("/srv/.tether/services/api/api.exe"));
            assert_eq!(exe, PathBuf::from("/srv/build/server.exe"));
        }
        #[cfg(not(windows))]
        {
            assert_eq!(bare, PathBuf::from("/srv/.tether/services/api/api"));
            assert_eq!(exe, PathBuf::from("/srv/build/server"));
        }
        assert_eq!(script, PathBuf::from("/srv/server.js"));
    }

    #[test]
    fn test_executable_fallback_prefers_existing_exe() {
        let temp_dir = TempDir::new().unwrap();
        let bare = temp_dir.path().join("service");
        std::fs::write(temp_dir.path().join("service.exe"), b"").unwrap();

        assert_eq!(executable_fallback(&bare), temp_dir.path().join("service.exe"));

        std::fs::write(&bare, b"").unwrap();
        assert_eq!(executable_fallback(&bare), bare);
    }

    #[test]
    fn test_shell_command() {
        let (program, args) = shell_command("echo hi");
        assert!(!program.is_empty());
        assert_eq!(args.last().map(String::as_str), Some("echo hi"));
    }
}
