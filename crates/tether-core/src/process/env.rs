//! Environment files for service processes.
//!
//! Files are read in order `.env`, `.env.local`, `.env.<mode>`,
//! `.env.<mode>.local`; later files win. Parsed results are cached per
//! (mode, root) for the lifetime of the loader.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Variables parsed from env files.
pub type EnvVars = BTreeMap<String, String>;

/// Env file names for `mode`, lowest precedence first.
pub fn env_files(mode: &str) -> [String; 4] {
    [
        ".env".to_string(),
        ".env.local".to_string(),
        format!(".env.{}", mode),
        format!(".env.{}.local", mode),
    ]
}

/// Parse `KEY=value` lines.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is allowed,
/// and matching single or double quotes around a value are removed.
pub fn parse_env(contents: &str) -> EnvVars {
    let mut vars = EnvVars::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), parse_value(value.trim()));
    }

    vars
}

fn parse_value(raw: &str) -> String {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            let inner = &raw[1..raw.len() - 1];
            return if quote == '"' {
                inner.replace("\\n", "\n")
            } else {
                inner.to_string()
            };
        }
    }

    // Unquoted values end at an inline comment
    match raw.find(" #") {
        Some(idx) => raw[..idx].trim_end().to_string(),
        None => raw.to_string(),
    }
}

/// Cached env file loader.
#[derive(Debug, Default)]
pub struct EnvLoader {
    cache: Mutex<HashMap<(String, PathBuf), Arc<EnvVars>>>,
}

impl EnvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the merged env files for `mode` under `root`.
    pub async fn load(&self, mode: &str, root: &Path) -> Arc<EnvVars> {
        let key = (mode.to_string(), root.to_path_buf());
        if let Some(vars) = self.lock().get(&key) {
            return Arc::clone(vars);
        }

        let mut merged = EnvVars::new();
        for name in env_files(mode) {
            let path = root.join(&name);
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => {
                    let vars = parse_env(&contents);
                    debug!("Loaded {} variables from {}", vars.len(), path.display());
                    merged.extend(vars);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to read env file {}: {}", path.display(), e),
            }
        }

        let merged = Arc::new(merged);
        self.lock().insert(key, Arc::clone(&merged));
        merged
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, PathBuf), Arc<EnvVars>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}
