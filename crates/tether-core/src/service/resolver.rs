//! Configuration resolver.
//!
//! Turns user service specs into per-target descriptors. A spec that cannot
//! be resolved for the current target and mode is dropped from the result
//! rather than reported as an error, so one bad entry never blocks its
//! siblings.

use super::publish::{merge_publish, PublishOverrides};
use super::resolved::{LocalService, ResolvedMap, ResolvedService};
use super::spec::{BuildableService, ServiceDefinition, ServiceSpec};
use super::status::StatusHandle;
use super::target::{Mode, PublishMode, ServiceSelection, Target};
use crate::config::{ServiceConfig, WorkspaceConfig};
use crate::error::{Result, TetherError};
use crate::network::{get_free_port, get_local_ip, is_loopback_host};
use crate::platform::apply_executable_suffix;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// User-declared services keyed by name.
pub type ServiceMap = BTreeMap<String, ServiceSpec>;

/// Inputs of one resolution pass.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Project root; relative sources resolve against it.
    pub root: PathBuf,
    pub target: Target,
    /// Producing a distributable rather than running for development.
    pub build: bool,
    pub services: ServiceSelection,
}

impl ResolveOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            target: Target::default(),
            build: false,
            services: ServiceSelection::default(),
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_build(mut self, build: bool) -> Self {
        self.build = build;
        self
    }

    pub fn with_services(mut self, services: ServiceSelection) -> Self {
        self.services = services;
        self
    }

    pub fn services_only(&self) -> bool {
        self.services.is_services_only()
    }

    pub fn mode(&self) -> Mode {
        Mode::derive(self.target, self.build, self.services_only())
    }

    pub fn publish_mode(&self) -> PublishMode {
        PublishMode::for_target(self.target, self.services_only())
    }

    /// Reject selections that name services missing from `specs`.
    pub fn validate_selection(&self, specs: &ServiceMap) -> Result<()> {
        let ServiceSelection::Only(names) = &self.services else {
            return Ok(());
        };

        let missing: Vec<String> = names
            .iter()
            .filter(|name| !specs.contains_key(name.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(TetherError::InvalidSelection {
                requested: missing,
                available: specs.keys().cloned().collect(),
            })
        }
    }
}

/// Resolve one service. `None` means the service does not apply to this pass.
pub async fn resolve_service(
    spec: &ServiceSpec,
    name: &str,
    opts: &ResolveOptions,
) -> Option<ResolvedService> {
    match try_resolve_service(spec, name, opts).await {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!("Dropping service {}: {}", name, e);
            None
        }
    }
}

/// Resolve the selected services concurrently, omitting dropped ones.
pub async fn resolve_all(specs: &ServiceMap, opts: &ResolveOptions) -> ResolvedMap {
    let pending = specs
        .iter()
        .filter(|(name, _)| opts.services.includes(name))
        .map(|(name, spec)| async move { (name.clone(), resolve_service(spec, name, opts).await) });

    join_all(pending)
        .await
        .into_iter()
        .filter_map(|(name, resolved)| resolved.map(|resolved| (name, resolved)))
        .collect()
}

async fn try_resolve_service(
    spec: &ServiceSpec,
    name: &str,
    opts: &ResolveOptions,
) -> Result<Option<ResolvedService>> {
    let Some(mut declaration) = spec.declaration(&opts.root) else {
        if let ServiceSpec::Resolved(resolved) = spec {
            return Ok(Some(resolved.clone()));
        }
        return Ok(None);
    };

    let mode = opts.mode();
    let services_only = opts.services_only();

    let mut overrides = match merge_publish(declaration.publish.as_ref(), opts.publish_mode()) {
        Some(overrides) => overrides,
        None if mode.is_build() && !services_only => {
            debug!("Service {} is not published for {}", name, opts.publish_mode().as_str());
            return Ok(None);
        }
        None => PublishOverrides::default(),
    };
    overrides.apply_to(&mut declaration, &opts.root);

    if services_only {
        if declaration.src.is_some() {
            declaration.url = None;
        }
    } else if mode.is_build() && declaration.url.is_some() {
        declaration.src = None;
    }

    let service = match ServiceDefinition::classify(declaration) {
        None => {
            debug!("Service {} declares neither src nor url", name);
            return Ok(None);
        }
        Some(ServiceDefinition::Remote { url }) => {
            return Ok(Some(ResolvedService::Remote { url }));
        }
        Some(ServiceDefinition::Buildable(service)) => service,
    };

    if mode == Mode::RemoteBuild {
        debug!("Service {} has no remote URL, skipping for {}", name, opts.target);
        return Ok(None);
    }

    resolve_local(service, name, &overrides, opts, mode)
        .await
        .map(|local| Some(ResolvedService::Local(local)))
}

async fn resolve_local(
    service: BuildableService,
    name: &str,
    overrides: &PublishOverrides,
    opts: &ResolveOptions,
    mode: Mode,
) -> Result<LocalService> {
    let production = mode.is_build();
    let source = absolute(&opts.root, &service.src);
    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let precompile = ServiceConfig::precompile_target(&extension);
    let autobuild = service.build.is_none() && ServiceConfig::is_autobuild_extension(&extension);
    let compile = precompile.is_some() && !production;
    let requires_build = service.build.is_some() || autobuild || precompile.is_some();

    let base = requires_build.then(|| match &overrides.base {
        Some(base) => absolute(&opts.root, base),
        None => default_output_base(&opts.root, name, production),
    });

    let filepath = match &base {
        Some(base) if production => match &overrides.src {
            Some(src) => base.join(src),
            None => base.join(name),
        },
        Some(base) if compile => {
            let extension = precompile.unwrap_or(ServiceConfig::EXECUTABLE_EXTENSION);
            base.join(format!("{}.{}", ServiceConfig::COMPILED_STEM, extension))
        }
        Some(base) if autobuild => base.join(format!("{}.js", name)),
        _ => source.clone(),
    };
    let filepath = apply_executable_suffix(&filepath);

    let (mut host, port, scheme) = endpoint(&service, name).await?;
    let mut public = service.public;
    if opts.target.is_mobile() && is_loopback_host(&host) {
        public = true;
        host = get_local_ip();
    }

    debug!("Resolved service {} -> {}", name, filepath.display());

    Ok(LocalService {
        filepath,
        source,
        base,
        build: service.build,
        url: format!("{}://{}:{}", scheme, host, port),
        host,
        port,
        public,
        description: service.description,
        status: StatusHandle::new(),
        autobuild,
        compile,
        monitor: service.monitor,
    })
}

/// Host, port and scheme for a local service.
///
/// An explicit URL supplies the values first, then the declared host/port,
/// then `localhost` and a free port.
async fn endpoint(service: &BuildableService, name: &str) -> Result<(String, u16, String)> {
    let explicit = match &service.url {
        Some(raw) => Some(
            Url::parse(raw)
                .ok()
                .filter(|url| url.has_host())
                .ok_or_else(|| TetherError::InvalidUrl {
                    service: name.to_string(),
                    url: raw.clone(),
                })?,
        ),
        None => None,
    };

    let host = explicit
        .as_ref()
        .and_then(|url| url.host_str().map(str::to_string))
        .or_else(|| service.host.clone())
        .unwrap_or_else(|| ServiceConfig::DEFAULT_HOST.to_string());

    let port = match explicit.as_ref().and_then(|url| url.port_or_known_default()).or(service.port) {
        Some(port) => port,
        None => get_free_port().await?,
    };

    let scheme = explicit
        .as_ref()
        .map(|url| url.scheme().to_string())
        .unwrap_or_else(|| "http".to_string());

    Ok((host, port, scheme))
}

fn default_output_base(root: &Path, name: &str, production: bool) -> PathBuf {
    let workspace = if production {
        WorkspaceConfig::SERVICES_DIR
    } else {
        WorkspaceConfig::TEMP_SERVICES_DIR
    };
    root.join(WorkspaceConfig::WORKSPACE_DIR)
        .join(workspace)
        .join(name)
}

fn absolute(root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path.strip_prefix("./").unwrap_or(path))
    }
}
