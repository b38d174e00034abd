//! Resolved service descriptors.

use super::spec::{BuildSpec, MonitorConfig};
use super::status::StatusHandle;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolved services keyed by name.
pub type ResolvedMap = BTreeMap<String, ResolvedService>;

/// Runtime shape of a service for one target and mode.
///
/// Exactly one of "URL passthrough" or "has a filepath" holds.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResolvedService {
    /// Already reachable; nothing is spawned.
    Remote { url: String },
    /// Backed by a local executable or script.
    Local(LocalService),
}

impl ResolvedService {
    pub fn url(&self) -> &str {
        match self {
            ResolvedService::Remote { url } => url,
            ResolvedService::Local(local) => &local.url,
        }
    }

    pub fn as_local(&self) -> Option<&LocalService> {
        match self {
            ResolvedService::Local(local) => Some(local),
            ResolvedService::Remote { .. } => None,
        }
    }

    pub fn as_local_mut(&mut self) -> Option<&mut LocalService> {
        match self {
            ResolvedService::Local(local) => Some(local),
            ResolvedService::Remote { .. } => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ResolvedService::Remote { .. })
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.as_local().map(|local| local.filepath.as_path())
    }
}

/// A service backed by a local file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalService {
    /// What gets executed.
    pub filepath: PathBuf,
    /// Absolute path of the declared source.
    pub source: PathBuf,
    /// Output directory when a build is required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    pub url: String,
    pub host: String,
    pub port: u16,
    pub public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: StatusHandle,
    /// Bundled automatically (no explicit build step).
    pub autobuild: bool,
    /// Compiled into the development workspace.
    pub compile: bool,
    pub monitor: MonitorConfig,
}

impl LocalService {
    /// Point the service at a new host, keeping scheme and port.
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
        self.url = format!("{}://{}:{}", self.scheme(), self.host, self.port);
    }

    fn scheme(&self) -> &str {
        self.url
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or("http")
    }
}
