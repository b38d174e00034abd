//! Tether Core - service resolution and process supervision for multi-target
//! app packaging.
//!
//! A project declares named backend services (scripts, compiled executables
//! or remote URLs). This crate resolves them into per-target descriptors and
//! runs the local ones as supervised child processes.
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_core::{ProjectManifest, ResolveOptions, StartOptions, Supervisor, Target};
//!
//! #[tokio::main]
//! async fn main() -> tether_core::Result<()> {
//!     let manifest = ProjectManifest::load(".")?;
//!     let opts = ResolveOptions::new(".").with_target(Target::Desktop);
//!
//!     let supervisor = Supervisor::new();
//!     let group = supervisor
//!         .create_all(&manifest.services, &opts, StartOptions::from(&opts))
//!         .await;
//!     println!("{}", serde_json::to_string(&group.sanitized())?);
//!
//!     group.shutdown(std::time::Duration::from_secs(2)).await;
//!     Ok(())
//! }
//! ```

pub mod build;
pub mod config;
pub mod error;
pub mod manifest;
pub mod network;
pub mod platform;
pub mod process;
pub mod service;

// Re-export commonly used types
pub use build::{build_all, build_service, BuildContext, BuildHook};
pub use error::{Result, TetherError};
pub use manifest::ProjectManifest;
pub use network::{get_free_port, get_free_ports, get_local_ip};
pub use process::{
    ActiveService, Launcher, LauncherRegistry, ServiceGroup, StartOptions, Supervisor,
};
pub use service::{
    expose_on_lan, resolve_all, resolve_service, sanitize, BuildSpec, LocalService, Mode,
    PublishMode, PublishSpec, ResolveOptions, ResolvedMap, ResolvedService, SanitizedMap,
    SanitizedService, ServiceDeclaration, ServiceMap, ServiceSelection, ServiceSpec,
    ServiceStatus, StatusHandle, Target,
};
