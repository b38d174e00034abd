//! Service declarations and their resolution.
//!
//! # Architecture
//!
//! - `spec` - User-facing service, build and publish declarations
//! - `target` - Targets, modes and service selection
//! - `publish` - Publish override merging
//! - `resolver` - Spec -> resolved descriptor
//! - `resolved` - Resolved descriptors
//! - `status` - Shared liveness status
//! - `sanitize` - Client-safe projection
//! - `expose` - LAN exposure

pub mod expose;
pub mod publish;
pub mod resolved;
pub mod resolver;
pub mod sanitize;
pub mod spec;
pub mod status;
pub mod target;

pub use expose::expose_on_lan;
pub use publish::{merge_publish, PublishOverrides};
pub use resolved::{LocalService, ResolvedMap, ResolvedService};
pub use resolver::{resolve_all, resolve_service, ResolveOptions, ServiceMap};
pub use sanitize::{sanitize, SanitizedMap, SanitizedService};
pub use spec::{
    is_valid_url, BuildSpec, BuildableService, MonitorConfig, PublishConfig, PublishSpec,
    ServiceDeclaration, ServiceDefinition, ServiceSpec,
};
pub use status::{ServiceStatus, StatusHandle};
pub use target::{Mode, PublishMode, ServiceSelection, Target};
