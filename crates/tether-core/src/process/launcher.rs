//! Launchers map a service file to the command that runs it.

use crate::config::{ServiceConfig, SupervisorConfig};
use crate::platform::{executable_fallback, python_command};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

/// Builds the command for a service file.
pub trait Launcher: Send + Sync {
    fn command(&self, filepath: &Path) -> Command;
}

/// Runs the file through an interpreter: `<program> <file>`.
#[derive(Debug, Clone)]
pub struct Interpreter {
    program: String,
}

impl Interpreter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Launcher for Interpreter {
    fn command(&self, filepath: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.arg(filepath);
        command
    }
}

/// Executes the file directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Direct;

impl Launcher for Direct {
    fn command(&self, filepath: &Path) -> Command {
        Command::new(filepath)
    }
}

/// Extension -> launcher table. The empty extension covers extension-less
/// files.
#[derive(Clone)]
pub struct LauncherRegistry {
    launchers: HashMap<String, Arc<dyn Launcher>>,
}

impl LauncherRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            launchers: HashMap::new(),
        }
    }

    /// Register (or replace) the launcher for `extension` (without the dot).
    pub fn register(&mut self, extension: &str, launcher: impl Launcher + 'static) -> &mut Self {
        self.launchers
            .insert(extension.to_ascii_lowercase(), Arc::new(launcher));
        self
    }

    pub fn get(&self, extension: &str) -> Option<Arc<dyn Launcher>> {
        self.launchers.get(&extension.to_ascii_lowercase()).cloned()
    }

    /// Pick the file to run and its launcher.
    ///
    /// Extension-less paths fall back to `<path>.exe` when only that exists.
    /// Returns `None` when no launcher is registered for the extension.
    pub fn resolve(&self, filepath: &Path) -> Option<(PathBuf, Arc<dyn Launcher>)> {
        let filepath = executable_fallback(filepath);
        let extension = filepath
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.get(extension).map(|launcher| (filepath.clone(), launcher))
    }

    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.launchers.keys().cloned().collect();
        extensions.sort();
        extensions
    }
}

impl Default for LauncherRegistry {
    /// Scripts through Node, Python through the platform interpreter,
    /// extension-less and `.exe` files directly.
    fn default() -> Self {
        let mut registry = Self::empty();
        for extension in ServiceConfig::SCRIPT_EXTENSIONS {
            registry.register(extension, Interpreter::new(SupervisorConfig::NODE_RUNTIME));
        }
        registry
            .register("py", Interpreter::new(python_command()))
            .register("", Direct)
            .register("exe", Direct);
        registry
    }
}

impl fmt::Debug for LauncherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LauncherRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}
