//! User-declared service specifications.
//!
//! A spec arrives either as a bare string or as an object. Before any
//! resolution logic touches it, it is normalized into a [`ServiceDeclaration`]
//! and, once publish overrides are applied, classified into a
//! [`ServiceDefinition`].

use super::resolved::ResolvedService;
use crate::build::BuildHook;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// One entry of the user's service map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServiceSpec {
    /// A bare path or URL.
    Shorthand(String),
    /// A full declaration.
    Config(Box<ServiceDeclaration>),
    /// A descriptor from an earlier resolution pass, returned unchanged.
    #[serde(skip_deserializing)]
    Resolved(ResolvedService),
}

impl ServiceSpec {
    /// Normalize to a declaration. Returns `None` for already-resolved specs.
    pub fn declaration(&self, root: &Path) -> Option<ServiceDeclaration> {
        match self {
            ServiceSpec::Shorthand(raw) => Some(ServiceDeclaration::from_shorthand(raw, root)),
            ServiceSpec::Config(declaration) => Some((**declaration).clone()),
            ServiceSpec::Resolved(_) => None,
        }
    }
}

impl From<ResolvedService> for ServiceSpec {
    fn from(resolved: ResolvedService) -> Self {
        ServiceSpec::Resolved(resolved)
    }
}

impl From<ServiceDeclaration> for ServiceSpec {
    fn from(declaration: ServiceDeclaration) -> Self {
        ServiceSpec::Config(Box::new(declaration))
    }
}

impl From<&str> for ServiceSpec {
    fn from(raw: &str) -> Self {
        ServiceSpec::Shorthand(raw.to_string())
    }
}

/// Object form of a service spec.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceDeclaration {
    /// Source file (script, compiled executable, or native binary).
    #[serde(default)]
    pub src: Option<String>,
    /// External URL. Advisory for local services (host/port only).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Reachable from other devices on the network.
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub build: Option<BuildSpec>,
    #[serde(default)]
    pub publish: Option<PublishSpec>,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl ServiceDeclaration {
    /// Interpret a bare string: a URL when it parses as one and is not an
    /// existing file, otherwise a source path.
    pub fn from_shorthand(raw: &str, root: &Path) -> Self {
        if is_valid_url(raw, root) {
            Self {
                url: Some(raw.to_string()),
                ..Default::default()
            }
        } else {
            Self {
                src: Some(raw.to_string()),
                ..Default::default()
            }
        }
    }

    pub fn src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn build(mut self, build: BuildSpec) -> Self {
        self.build = Some(build);
        self
    }

    pub fn publish(mut self, publish: PublishSpec) -> Self {
        self.publish = Some(publish);
        self
    }
}

/// Whether to capture a service's output streams into the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_true")]
    pub stdout: bool,
    #[serde(default = "default_true")]
    pub stderr: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stdout: true,
            stderr: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// How a service artifact is produced.
#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum BuildSpec {
    /// Shell command run from the project root.
    Command(String),
    /// Platform name -> shell command.
    PerPlatform(BTreeMap<String, String>),
    /// Programmatic build step.
    #[serde(skip_deserializing)]
    Hook(Arc<dyn BuildHook>),
}

impl fmt::Debug for BuildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildSpec::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
            BuildSpec::PerPlatform(map) => f.debug_tuple("PerPlatform").field(map).finish(),
            BuildSpec::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

impl Serialize for BuildSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BuildSpec::Command(cmd) => serializer.serialize_str(cmd),
            BuildSpec::PerPlatform(map) => map.serialize(serializer),
            BuildSpec::Hook(_) => serializer.serialize_str("<hook>"),
        }
    }
}

/// Publish configuration: `false`, `true`, an output `src`, or an object
/// optionally split into `local`/`remote` layers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PublishSpec {
    Enabled(bool),
    Src(String),
    Config(Box<PublishConfig>),
}

/// Object form of a publish layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishConfig {
    /// Published artifact, relative to `base`.
    #[serde(default)]
    pub src: Option<String>,
    /// Directory holding the published artifact.
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub build: Option<BuildSpec>,
    #[serde(default)]
    pub local: Option<PublishSpec>,
    #[serde(default)]
    pub remote: Option<PublishSpec>,
}

/// A declaration after publish overrides, as a single concrete variant.
#[derive(Debug, Clone)]
pub enum ServiceDefinition {
    /// Nothing to run locally; the service already lives at this URL.
    Remote { url: String },
    /// A source file that is run (and possibly built) locally.
    Buildable(BuildableService),
}

/// Local half of [`ServiceDefinition`].
#[derive(Debug, Clone)]
pub struct BuildableService {
    pub src: String,
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public: bool,
    pub description: Option<String>,
    pub build: Option<BuildSpec>,
    pub monitor: MonitorConfig,
}

impl ServiceDefinition {
    /// Classify a declaration. `None` when it has neither a source nor a URL.
    pub fn classify(declaration: ServiceDeclaration) -> Option<Self> {
        match (declaration.src, declaration.url) {
            (Some(src), url) => Some(ServiceDefinition::Buildable(BuildableService {
                src,
                url,
                host: declaration.host,
                port: declaration.port,
                public: declaration.public,
                description: declaration.description,
                build: declaration.build,
                monitor: declaration.monitor,
            })),
            (None, Some(url)) => Some(ServiceDefinition::Remote { url }),
            (None, None) => None,
        }
    }
}

/// A string is a URL when it is not an existing path and parses with a host.
pub fn is_valid_url(raw: &str, root: &Path) -> bool {
    if root.join(raw).exists() {
        return false;
    }
    Url::parse(raw)
        .map(|url| url.host_str().is_some_and(|host| !host.is_empty()))
        .unwrap_or(false)
}
