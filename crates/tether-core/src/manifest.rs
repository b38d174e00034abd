//! Project manifest loading.
//!
//! A project declares its services in `tether.json` at the project root:
//!
//! ```json
//! {
//!   "name": "notes",
//!   "target": "desktop",
//!   "services": {
//!     "api": { "src": "./api/server.ts", "port": 2345 },
//!     "search": "https://search.example.com"
//!   }
//! }
//! ```

use crate::config::WorkspaceConfig;
use crate::error::{Result, TetherError};
use crate::service::{ServiceMap, Target};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parsed project manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub name: Option<String>,
    /// Default target when none is given on the command line.
    #[serde(default)]
    pub target: Option<Target>,
    #[serde(default)]
    pub services: ServiceMap,
}

impl ProjectManifest {
    /// Manifest path for a project root.
    pub fn path(root: &Path) -> PathBuf {
        root.join(WorkspaceConfig::MANIFEST_FILENAME)
    }

    /// Load `<root>/tether.json`.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let path = Self::path(root.as_ref());
        if !path.exists() {
            return Err(TetherError::FileNotFound(path));
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| TetherError::Io {
            message: format!("Failed to read manifest: {}", e),
            path: Some(path.clone()),
            source: Some(e),
        })?;

        let manifest: ProjectManifest =
            serde_json::from_str(&contents).map_err(|e| TetherError::Json {
                message: format!("Failed to parse {}: {}", path.display(), e),
                source: Some(e),
            })?;

        if manifest.services.keys().any(|name| name.trim().is_empty()) {
            return Err(TetherError::Config {
                message: "service names must not be empty".to_string(),
            });
        }

        debug!(
            "Loaded manifest {} with {} service(s)",
            path.display(),
            manifest.services.len()
        );
        Ok(manifest)
    }
}
