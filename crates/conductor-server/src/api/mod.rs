//! API module for the Conductor Server
//!
//! This module contains the API routes and handlers for the Conductor Server.

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod errors;
pub mod health;
pub mod registry;
pub mod workflows;

use crate::server::ConductorServer;

/// Build the router for API endpoints
pub fn build_router(server: Arc<ConductorServer>) -> Router {
    Router::new()
        // Service registry
        .route("/coordinator/mcps", get(registry::dashboard_handler))
        .route("/coordinator/mcps/api", get(registry::list_services_handler))
        .route("/coordinator/mcps/register", post(registry::register_service_handler))
        .route(
            "/coordinator/mcps/:name",
            get(registry::get_service_handler).delete(registry::deregister_service_handler),
        )
        .route("/coordinator/mcps/:name/status", put(registry::update_status_handler))
        // Workflows
        .route("/workflows", get(workflows::list_workflows_handler))
        .route("/workflows/:name/execute", post(workflows::execute_workflow_handler))
        // Health check
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        // Shared state
        .with_state(server)
}
