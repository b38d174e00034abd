//! Tether Share - run a project's services and publish their URLs on the LAN.
//!
//! Resolves the services declared in the project manifest, rewrites local
//! services to the LAN address, starts them, and serves the sanitized service
//! table so devices on the same network can discover them.

mod handler;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tether_core::config::{ShareConfig, SupervisorConfig};
use tether_core::{
    build_all, expose_on_lan, resolve_all, ProjectManifest, ResolveOptions, ServiceSelection,
    StartOptions, Supervisor, Target,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tether-share")]
#[command(about = "Share project services on the local network")]
struct Args {
    /// Project root containing tether.json (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Target to resolve services for (web, desktop, mobile or an alias)
    #[arg(short, long)]
    target: Option<Target>,

    /// Only share these services
    #[arg(short, long, num_args = 1..)]
    services: Vec<String>,

    /// Host to bind to
    #[arg(long, default_value = ShareConfig::DEFAULT_BIND_HOST)]
    host: String,

    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Run declared build steps and use production artifacts
    #[arg(long)]
    build: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    info!("Project root: {}", root.display());

    let manifest = ProjectManifest::load(&root)?;
    let target = args.target.or(manifest.target).unwrap_or_default();
    let services = if args.services.is_empty() {
        ServiceSelection::Default
    } else {
        ServiceSelection::Only(args.services)
    };

    let opts = ResolveOptions::new(&root)
        .with_target(target)
        .with_build(args.build)
        .with_services(services);
    opts.validate_selection(&manifest.services)?;

    info!(
        "Sharing {} services for {}",
        manifest.name.as_deref().unwrap_or("project"),
        target
    );

    let mut resolved = resolve_all(&manifest.services, &opts).await;
    expose_on_lan(&mut resolved);

    if args.build {
        for (name, outcome) in build_all(&resolved, &root).await {
            if let Err(e) = outcome {
                warn!("Service {} will not be shared: {}", name, e);
                resolved.remove(&name);
            }
        }
    }

    let supervisor = Supervisor::new();
    let active = supervisor
        .start_all(&resolved, &StartOptions::from(&opts))
        .await;
    for (id, service) in &active {
        info!("{} -> {}", id, service.service.url);
    }

    let addr = server::start_server(resolved, supervisor.clone(), &args.host, args.port).await?;

    // Print port for the caller to read (intentional stdout)
    println!("SHARE_PORT={}", addr.port());

    info!("Share server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping services");
    supervisor.shutdown(SupervisorConfig::SHUTDOWN_TIMEOUT).await;

    Ok(())
}
