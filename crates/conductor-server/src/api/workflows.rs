//! Workflow endpoints

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::{ServerError, ServerResult};
use crate::server::ConductorServer;

/// Summary of a configured workflow
#[derive(Debug, Serialize)]
pub struct WorkflowSummary {
    /// Workflow name
    pub name: String,
    /// Definition version
    pub version: String,
    /// Description, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Step ids in execution order
    pub steps: Vec<String>,
}

/// List configured workflows
pub async fn list_workflows_handler(State(server): State<Arc<ConductorServer>>) -> impl IntoResponse {
    let workflows: Vec<WorkflowSummary> = server
        .workflows()
        .map(|runner| {
            let definition = runner.definition();
            WorkflowSummary {
                name: definition.name.clone(),
                version: definition.version.clone(),
                description: definition.description.clone(),
                steps: definition.steps.iter().map(|s| s.id.0.clone()).collect(),
            }
        })
        .collect();

    Json(json!({
        "success": true,
        "total_count": workflows.len(),
        "workflows": workflows,
    }))
}

/// Run a workflow with the request body as its request.
///
/// An empty body runs with `{}`. The outcome is returned whatever happened;
/// only the status code differs.
pub async fn execute_workflow_handler(
    State(server): State<Arc<ConductorServer>>,
    Path(name): Path<String>,
    body: Bytes,
) -> ServerResult<impl IntoResponse> {
    let runner = server.workflow(&name)?;

    let request: Value = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ServerError::ValidationError(format!("Invalid request body: {}", e)))?
    };

    let cancellation = server.shutdown_token().child_token();
    let outcome = runner.execute_with_cancellation(request, &cancellation).await;

    let status = if outcome.is_success() {
        StatusCode::OK
    } else if outcome.is_cancelled() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    info!(
        workflow = %name,
        execution_id = %outcome.execution_id(),
        %status,
        "Workflow request finished"
    );
    Ok((status, Json(outcome)))
}
