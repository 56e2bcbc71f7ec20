//! Step executor that forwards steps to registered services over HTTP

use async_trait::async_trait;
use conductor_core::{
    CoreError, ServiceRegistry, ServiceStatus, StepDefinition, StepExecutor, WorkflowContext,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ServerResult;

/// Executes a step by POSTing it to the service that should handle it.
///
/// The target is the step's `service` parameter, or the execution's adapter
/// label when the step names none. The request path comes from the step's
/// `path` parameter and defaults to `/`.
#[derive(Debug, Clone)]
pub struct ServiceDispatchExecutor {
    registry: Arc<ServiceRegistry>,
    client: reqwest::Client,
}

impl ServiceDispatchExecutor {
    /// Create an executor with its own HTTP client
    pub fn new(registry: Arc<ServiceRegistry>, timeout: Duration) -> ServerResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(registry, client))
    }

    /// Create an executor around an existing client
    pub fn with_client(registry: Arc<ServiceRegistry>, client: reqwest::Client) -> Self {
        Self { registry, client }
    }
}

/// Join a service address and a request path into a URL
pub fn service_url(address: &str, path: &str) -> String {
    let base = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };
    let base = base.trim_end_matches('/');

    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

#[async_trait]
impl StepExecutor for ServiceDispatchExecutor {
    async fn execute(&self, step: &StepDefinition, context: &WorkflowContext) -> Result<Value, CoreError> {
        let target = step.param_str("service").unwrap_or(context.adapter.as_str());
        let service = self.registry.get(target).await?;

        if service.status == ServiceStatus::Unhealthy {
            return Err(CoreError::ExternalDependencyError(format!(
                "Service '{}' is unhealthy",
                service.name
            )));
        }
        if service.address.trim().is_empty() {
            return Err(CoreError::ExternalDependencyError(format!(
                "Service '{}' has no address",
                service.name
            )));
        }

        let url = service_url(&service.address, step.param_str("path").unwrap_or("/"));
        let body = json!({
            "step": step.id,
            "workflow": context.workflow,
            "execution_id": context.execution_id,
            "request": context.request,
            "params": step.payload,
            "results": context.results(),
        });

        debug!(step_id = %step.id, service = %service.name, %url, "Dispatching step");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::ExternalDependencyError(format!("{} request failed: {}", service.name, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(step_id = %step.id, service = %service.name, %status, "Service returned an error");
            return Err(CoreError::ExternalDependencyError(format!(
                "{} returned {}: {}",
                service.name, status, text
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            CoreError::SerializationError(format!("{} returned a non-JSON body: {}", service.name, e))
        })
    }
}
