//! Health check endpoint for the Conductor Server

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::server::ConductorServer;

/// Health check handler
pub async fn health_check(State(server): State<Arc<ConductorServer>>) -> impl IntoResponse {
    debug!("Health check requested");

    Json(json!({
        "service": "Conductor Coordinator",
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "service_count": server.registry().len().await,
        "workflow_count": server.workflows().count(),
    }))
}
