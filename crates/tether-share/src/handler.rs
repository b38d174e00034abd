//! Share endpoint handlers.

use crate::server::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tether_core::{sanitize, SanitizedMap};
use tracing::debug;

/// Body of `GET /`.
#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: SanitizedMap,
}

/// Health check endpoint.
pub async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "active": state.supervisor.active_ids(),
    }))
}

/// Sanitized table of shared services.
pub async fn handle_services(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let services = sanitize(&state.resolved);
    debug!("Serving {} shared service(s)", services.len());
    Json(ServicesResponse { services })
}
