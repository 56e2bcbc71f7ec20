//! Main Conductor Server implementation
//!
//! This module contains the ConductorServer implementation.

use conductor_core::{ServiceRegistry, WorkflowRunner};
use indexmap::IndexMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Main server implementation
pub struct ConductorServer {
    /// Configuration
    pub config: ServerConfig,

    /// Shared service registry
    registry: Arc<ServiceRegistry>,

    /// Configured workflows by name, in load order
    workflows: IndexMap<String, WorkflowRunner>,

    /// Fires on shutdown; running workflows stop before their next step
    shutdown: CancellationToken,
}

/// Manual Debug implementation that doesn't try to debug the runners
impl std::fmt::Debug for ConductorServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConductorServer")
            .field("config", &self.config)
            .field("workflows", &self.workflows.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConductorServer {
    /// Create a new server; workflow names must be unique
    pub fn new(
        config: ServerConfig,
        registry: Arc<ServiceRegistry>,
        workflows: Vec<WorkflowRunner>,
    ) -> ServerResult<Self> {
        let mut by_name = IndexMap::new();
        for runner in workflows {
            let name = runner.name().to_string();
            if by_name.insert(name.clone(), runner).is_some() {
                return Err(ServerError::ConfigError(format!(
                    "Workflow '{}' is defined more than once",
                    name
                )));
            }
        }

        Ok(Self {
            config,
            registry,
            workflows: by_name,
            shutdown: CancellationToken::new(),
        })
    }

    /// The shared registry
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Look up a configured workflow
    pub fn workflow(&self, name: &str) -> ServerResult<&WorkflowRunner> {
        self.workflows
            .get(name)
            .ok_or_else(|| ServerError::NotFound(format!("Workflow '{}'", name)))
    }

    /// All configured workflows, in load order
    pub fn workflows(&self) -> impl Iterator<Item = &WorkflowRunner> {
        self.workflows.values()
    }

    /// Token that stops the server and any running workflows
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Bind the configured address and run until Ctrl-C or shutdown
    pub async fn run(self) -> ServerResult<()> {
        let addr = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::ConfigError(format!("Cannot bind {}: {}", addr, e)))?;

        let shutdown = self.shutdown_token();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => {
                        info!("Received Ctrl-C, shutting down");
                        shutdown.cancel();
                    }
                    Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
                },
                _ = shutdown.cancelled() => {}
            }
        });

        self.serve(listener).await
    }

    /// Serve on an already bound listener until the shutdown token fires
    pub async fn serve(self, listener: TcpListener) -> ServerResult<()> {
        let addr: SocketAddr = listener.local_addr()?;
        let shutdown = self.shutdown_token();
        let services = self.registry.len().await;

        info!(
            %addr,
            workflows = self.workflows.len(),
            services,
            "Conductor server listening"
        );

        let app = crate::api::build_router(Arc::new(self));
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Conductor server stopped");
        Ok(())
    }
}
