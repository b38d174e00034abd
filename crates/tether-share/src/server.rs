//! HTTP server implementation using Axum.

use crate::handler::{handle_health, handle_services};
use axum::{http::Method, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tether_core::config::ShareConfig;
use tether_core::{ResolvedMap, Supervisor};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Services as resolved (and exposed) at startup
    pub resolved: ResolvedMap,
    /// Supervisor running the local services
    pub supervisor: Supervisor,
}

/// Build the share router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(ShareConfig::CORS_MAX_AGE);

    Router::new()
        .route("/", get(handle_services))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Start the share HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    resolved: ResolvedMap,
    supervisor: Supervisor,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let state = Arc::new(AppState {
        resolved,
        supervisor,
    });

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Share server error: {}", e);
        }
    });

    Ok(actual_addr)
}
