//! Service registry endpoints
//!
//! The JSON shapes follow the coordinator's existing clients: every success
//! response carries `"success": true`, and the listing reports
//! `total_count` next to the services.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{Html, IntoResponse},
    Json,
};
use chrono::Utc;
use conductor_core::{RegistrationOutcome, ServiceRegistration, ServiceStatus};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::dashboard::render_dashboard;
use crate::error::{ServerError, ServerResult};
use crate::server::ConductorServer;

/// Path segments under `/coordinator/mcps` taken by fixed routes; services
/// with these names could not be addressed by name
pub const RESERVED_SERVICE_NAMES: [&str; 2] = ["api", "register"];

/// Body of a status update
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    /// New status
    pub status: ServiceStatus,
}

/// HTML dashboard of every registered service
pub async fn dashboard_handler(State(server): State<Arc<ConductorServer>>) -> impl IntoResponse {
    let entries = server.registry().list_all().await;
    Html(render_dashboard(&entries, Utc::now()))
}

/// List every registered service
pub async fn list_services_handler(State(server): State<Arc<ConductorServer>>) -> impl IntoResponse {
    let services = server.registry().list_all().await;
    Json(json!({
        "success": true,
        "timestamp": Utc::now().to_rfc3339(),
        "total_count": services.len(),
        "services": services,
    }))
}

/// Register a service, or update it if the name is already known
pub async fn register_service_handler(
    State(server): State<Arc<ConductorServer>>,
    payload: Result<Json<ServiceRegistration>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(registration) =
        payload.map_err(|rejection| ServerError::ValidationError(rejection.body_text()))?;

    if let Some(name) = registration.name.as_deref().map(str::trim) {
        if RESERVED_SERVICE_NAMES.contains(&name) {
            return Err(ServerError::ValidationError(format!(
                "service name '{}' is reserved",
                name
            )));
        }
    }

    let registered = server.registry().register(registration).await?;
    let message = match registered.outcome {
        RegistrationOutcome::Created => "Service registered",
        RegistrationOutcome::Updated => "Service updated",
    };

    info!(service = %registered.entry.name, outcome = ?registered.outcome, "Registration via API");
    Ok(Json(json!({
        "success": true,
        "message": message,
        "outcome": registered.outcome,
        "service": registered.entry,
    })))
}

/// Fetch one service
pub async fn get_service_handler(
    State(server): State<Arc<ConductorServer>>,
    Path(name): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let service = server.registry().get(&name).await?;
    Ok(Json(json!({
        "success": true,
        "service": service,
    })))
}

/// Record an externally observed status
pub async fn update_status_handler(
    State(server): State<Arc<ConductorServer>>,
    Path(name): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(update) =
        payload.map_err(|rejection| ServerError::ValidationError(rejection.body_text()))?;

    let service = server.registry().set_status(&name, update.status).await?;
    Ok(Json(json!({
        "success": true,
        "service": service,
    })))
}

/// Remove a service
pub async fn deregister_service_handler(
    State(server): State<Arc<ConductorServer>>,
    Path(name): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let removed = server.registry().deregister(&name).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Service deregistered",
        "service": removed,
    })))
}
