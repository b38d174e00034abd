//! Service build steps.
//!
//! Runs the `build` declared on a service: a shell command, a per-platform
//! shell command, or a programmatic hook. Services without a declared build
//! (auto-built scripts, precompiled sources) are left to the bundler.

use crate::error::{Result, TetherError};
use crate::platform::{current_platform, matches_platform_key, shell_command};
use crate::service::{BuildSpec, LocalService, ResolvedMap};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// What a build hook is asked to produce.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Service name.
    pub name: String,
    /// Project root.
    pub root: PathBuf,
    /// Declared source file.
    pub source: PathBuf,
    /// Output directory, when the resolver assigned one.
    pub base: Option<PathBuf>,
    /// Path the supervisor will execute.
    pub filepath: PathBuf,
}

impl BuildContext {
    pub fn new(name: &str, service: &LocalService, root: &Path) -> Self {
        Self {
            name: name.to_string(),
            root: root.to_path_buf(),
            source: service.source.clone(),
            base: service.base.clone(),
            filepath: service.filepath.clone(),
        }
    }
}

/// Programmatic build step.
#[async_trait]
pub trait BuildHook: Send + Sync {
    /// Produce the service artifact. Returns its location, if any.
    async fn build(&self, ctx: &BuildContext) -> Result<Option<PathBuf>>;
}

/// Run the declared build step of one service.
///
/// Returns the artifact location: the named file when a command refers to
/// an existing file, the output base after a shell build, or whatever the
/// hook returns. `Ok(None)` when there is nothing to run.
pub async fn build_service(
    name: &str,
    service: &LocalService,
    root: &Path,
) -> Result<Option<PathBuf>> {
    let Some(build) = &service.build else {
        return Ok(None);
    };

    match build {
        BuildSpec::Command(command) => run_command(name, command, service, root).await,
        BuildSpec::PerPlatform(commands) => {
            match commands.iter().find(|(key, _)| matches_platform_key(key)) {
                Some((_, command)) => run_command(name, command, service, root).await,
                None => {
                    warn!(
                        "Service {} has no build command for {}, skipping",
                        name,
                        current_platform()
                    );
                    Ok(None)
                }
            }
        }
        BuildSpec::Hook(hook) => {
            info!("Building service {} with hook", name);
            hook.build(&BuildContext::new(name, service, root)).await
        }
    }
}

/// Build every local service with a declared build step, one at a time.
///
/// A failing service does not stop the others; each outcome is reported.
pub async fn build_all(
    resolved: &ResolvedMap,
    root: &Path,
) -> BTreeMap<String, Result<Option<PathBuf>>> {
    let mut outcomes = BTreeMap::new();

    for (name, service) in resolved {
        let Some(local) = service.as_local() else {
            continue;
        };
        if local.build.is_none() {
            continue;
        }

        let outcome = build_service(name, local, root).await;
        if let Err(e) = &outcome {
            warn!("{}", e);
        }
        outcomes.insert(name.clone(), outcome);
    }

    outcomes
}

async fn run_command(
    name: &str,
    command: &str,
    service: &LocalService,
    root: &Path,
) -> Result<Option<PathBuf>> {
    let prebuilt = root.join(command);
    if prebuilt.is_file() {
        debug!("Service {} uses prebuilt {}", name, prebuilt.display());
        return Ok(Some(prebuilt));
    }

    if let Some(base) = &service.base {
        tokio::fs::create_dir_all(base)
            .await
            .map_err(|e| TetherError::io_with_path(e, base))?;
    }

    info!("Building service {}: {}", name, command);
    let (program, args) = shell_command(command);
    let output = Command::new(program)
        .args(&args)
        .current_dir(root)
        .output()
        .await
        .map_err(|e| TetherError::BuildFailed {
            service: name.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TetherError::BuildFailed {
            service: name.to_string(),
            message: format!("{} ({})", output.status, stderr.trim()),
        });
    }

    Ok(service.base.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{resolve_service, ResolveOptions, ServiceDeclaration, ServiceSpec, Target};
    use std::collections::BTreeMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn resolve(spec: ServiceDeclaration, root: &Path) -> LocalService {
        let opts = ResolveOptions::new(root)
            .with_target(Target::Desktop)
            .with_build(true);
        resolve_service(&ServiceSpec::from(spec), "api", &opts)
            .await
            .and_then(|resolved| resolved.as_local().cloned())
            .unwrap()
    }

    #[tokio::test]
    async fn test_prebuilt_file_is_returned() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("api-bin"), "").unwrap();

        let service = resolve(
            ServiceDeclaration::default()
                .src("./api.py")
                .build(BuildSpec::Command("api-bin".into())),
            temp_dir.path(),
        )
        .await;

        let artifact = build_service("api", &service, temp_dir.path()).await.unwrap();
        assert_eq!(artifact, Some(temp_dir.path().join("api-bin")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_command_runs_in_root() {
        let temp_dir = TempDir::new().unwrap();
        let service = resolve(
            ServiceDeclaration::default()
                .src("./api.py")
                .build(BuildSpec::Command("echo built > marker.txt".into())),
            temp_dir.path(),
        )
        .await;

        let artifact = build_service("api", &service, temp_dir.path()).await.unwrap();
        assert_eq!(artifact, service.base);
        assert!(service.base.unwrap().is_dir());
        assert!(temp_dir.path().join("marker.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command() {
        let temp_dir = TempDir::new().unwrap();
        let service = resolve(
            ServiceDeclaration::default()
                .src("./api.py")
                .build(BuildSpec::Command("exit 3".into())),
            temp_dir.path(),
        )
        .await;

        let err = build_service("api", &service, temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, TetherError::BuildFailed { ref service, .. } if service == "api"));
    }

    #[tokio::test]
    async fn test_missing_platform_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let mut commands = BTreeMap::new();
        commands.insert("amiga".to_string(), "exit 1".to_string());

        let service = resolve(
            ServiceDeclaration::default()
                .src("./api.py")
                .build(BuildSpec::PerPlatform(commands)),
            temp_dir.path(),
        )
        .await;

        assert_eq!(build_service("api", &service, temp_dir.path()).await.unwrap(), None);
    }

    struct CountingHook {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BuildHook for CountingHook {
        async fn build(&self, ctx: &BuildContext) -> Result<Option<PathBuf>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(ctx.root.join(format!("{}.out", ctx.name))))
        }
    }

    #[tokio::test]
    async fn test_hook_and_build_all() {
        let temp_dir = TempDir::new().unwrap();
        let hook = Arc::new(CountingHook {
            calls: AtomicUsize::new(0),
        });

        let service = resolve(
            ServiceDeclaration::default()
                .src("./api.py")
                .build(BuildSpec::Hook(hook.clone())),
            temp_dir.path(),
        )
        .await;

        let mut resolved = ResolvedMap::new();
        resolved.insert("api".into(), crate::service::ResolvedService::Local(service));
        resolved.insert(
            "remote".into(),
            crate::service::ResolvedService::Remote {
                url: "https://api.example.com".into(),
            },
        );

        let outcomes = build_all(&resolved, temp_dir.path()).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes["api"].as_ref().unwrap(),
            &Some(temp_dir.path().join("api.out"))
        );
        assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
    }
}
