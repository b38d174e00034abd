//! Centralized configuration for Tether.
//!
//! Workspace layout, extension tables and supervision timings live here so the
//! resolver and the supervisor agree on them.

use std::time::Duration;

/// Project workspace layout (relative to the project root).
pub struct WorkspaceConfig;

impl WorkspaceConfig {
    pub const WORKSPACE_DIR: &'static str = ".tether";
    pub const SERVICES_DIR: &'static str = "services";
    pub const TEMP_SERVICES_DIR: &'static str = ".temp.services";
    pub const MANIFEST_FILENAME: &'static str = "tether.json";
}

/// Service resolution defaults.
pub struct ServiceConfig;

impl ServiceConfig {
    pub const DEFAULT_HOST: &'static str = "localhost";
    pub const EXECUTABLE_EXTENSION: &'static str = "exe";
    pub const COMPILED_STEM: &'static str = "compiled";

    /// Script extensions run through the JavaScript runtime.
    pub const SCRIPT_EXTENSIONS: &'static [&'static str] = &["js", "cjs", "mjs"];

    /// Source extension -> compiled artifact extension.
    pub const PRECOMPILE_EXTENSIONS: &'static [(&'static str, &'static str)] =
        &[("ts", "cjs"), ("cpp", "exe")];

    /// Extensions that are bundled automatically when no build step is declared.
    pub fn is_autobuild_extension(ext: &str) -> bool {
        Self::SCRIPT_EXTENSIONS.contains(&ext) || ext == "ts"
    }

    /// Compiled artifact extension for a source extension, if it needs compiling.
    pub fn precompile_target(ext: &str) -> Option<&'static str> {
        Self::PRECOMPILE_EXTENSIONS
            .iter()
            .find(|(from, _)| *from == ext)
            .map(|(_, to)| *to)
    }
}

/// Process supervision timings and environment.
pub struct SupervisorConfig;

impl SupervisorConfig {
    pub const NODE_RUNTIME: &'static str = "node";
    pub const PORT_ENV: &'static str = "PORT";
    pub const HOST_ENV: &'static str = "HOST";
    pub const DEVELOPMENT_ENV_MODE: &'static str = "development";
    pub const PRODUCTION_ENV_MODE: &'static str = "production";

    /// How long stdout/stderr readers may drain after the process exits.
    pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);
    /// Grace period used by `shutdown` before a forceful kill.
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
    /// Wait after a forceful kill before giving up on the exit event.
    pub const KILL_TIMEOUT: Duration = Duration::from_secs(1);
    pub const READ_BUFFER_SIZE: usize = 8192;
}

/// Share discovery endpoint defaults.
pub struct ShareConfig;

impl ShareConfig {
    pub const DEFAULT_BIND_HOST: &'static str = "0.0.0.0";
    pub const CORS_MAX_AGE: Duration = Duration::from_secs(2_592_000);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_tables() {
        assert!(ServiceConfig::is_autobuild_extension("mjs"));
        assert!(ServiceConfig::is_autobuild_extension("ts"));
        assert!(!ServiceConfig::is_autobuild_extension("py"));
        assert_eq!(ServiceConfig::precompile_target("ts"), Some("cjs"));
        assert_eq!(ServiceConfig::precompile_target("cpp"), Some("exe"));
        assert_eq!(ServiceConfig::precompile_target("js"), None);
    }

    #[test]
    fn test_timeouts_are_reasonable() {
        assert!(SupervisorConfig::SHUTDOWN_TIMEOUT > SupervisorConfig::OUTPUT_DRAIN_TIMEOUT);
        assert!(SupervisorConfig::KILL_TIMEOUT > Duration::ZERO);
    }
}
