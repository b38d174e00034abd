//! Deployment targets, modes and service selection.

use crate::error::{Result, TetherError};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deliverable being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Web,
    Desktop,
    Mobile,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Web => "web",
            Target::Desktop => "desktop",
            Target::Mobile => "mobile",
        }
    }

    pub fn is_desktop(&self) -> bool {
        matches!(self, Target::Desktop)
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, Target::Mobile)
    }
}

impl FromStr for Target {
    type Err = TetherError;

    /// Parse a target or one of its platform aliases.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "web" | "pwa" => Ok(Target::Web),
            "desktop" | "electron" | "mac" | "macos" | "windows" | "linux" => Ok(Target::Desktop),
            "mobile" | "ios" | "android" => Ok(Target::Mobile),
            _ => Err(TetherError::InvalidTarget(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which `publish` sub-object applies to a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// Bundled alongside a packaged desktop app (or a services-only build).
    Local,
    /// Expected to already be reachable over the network.
    Remote,
}

impl PublishMode {
    pub fn for_target(target: Target, services_only: bool) -> Self {
        if target.is_desktop() || services_only {
            PublishMode::Local
        } else {
            PublishMode::Remote
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishMode::Local => "local",
            PublishMode::Remote => "remote",
        }
    }
}

/// Resolution mode derived from target and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    LocalBuild,
    RemoteBuild,
}

impl Mode {
    pub fn derive(target: Target, build: bool, services_only: bool) -> Self {
        if !build {
            return Mode::Development;
        }
        match PublishMode::for_target(target, services_only) {
            PublishMode::Local => Mode::LocalBuild,
            PublishMode::Remote => Mode::RemoteBuild,
        }
    }

    pub fn is_build(&self) -> bool {
        !matches!(self, Mode::Development)
    }
}

/// Which services a pass covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceSelection {
    /// Regular pass over every service.
    #[default]
    Default,
    /// Services-only pass over every service.
    All,
    /// Services-only pass over the named services.
    Only(Vec<String>),
}

impl ServiceSelection {
    pub fn is_services_only(&self) -> bool {
        !matches!(self, ServiceSelection::Default)
    }

    pub fn includes(&self, name: &str) -> bool {
        match self {
            ServiceSelection::Default | ServiceSelection::All => true,
            ServiceSelection::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

impl<'de> Deserialize<'de> for ServiceSelection {
    /// Accepts `bool | string | string[]`.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            One(String),
            Many(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => ServiceSelection::Default,
            Raw::Flag(true) => ServiceSelection::All,
            Raw::One(name) => ServiceSelection::Only(vec![name]),
            Raw::Many(names) => ServiceSelection::Only(names),
        })
    }
}
