//! Error types for Tether.
//!
//! Resolution and supervision never surface these to sibling services: the
//! public entry points convert them into dropped map entries or logged
//! warnings. They are returned directly by port allocation, manifest loading
//! and service builds.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Tether library.
#[derive(Debug, Error)]
pub enum TetherError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid service selection: {requested:?} (available: {available:?})")]
    InvalidSelection {
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("Invalid URL for service {service}: {url}")]
    InvalidUrl { service: String, url: String },

    // Network errors
    #[error("Failed to allocate free port: {message}")]
    PortAllocation {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Build errors
    #[error("Build failed for service {service}: {message}")]
    BuildFailed { service: String, message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Tether operations.
pub type Result<T> = std::result::Result<T, TetherError>;

impl From<std::io::Error> for TetherError {
    fn from(err: std::io::Error) -> Self {
        TetherError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(err: serde_json::Error) -> Self {
        TetherError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl TetherError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        TetherError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }
}
