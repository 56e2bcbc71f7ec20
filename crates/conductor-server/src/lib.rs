//!
//! Conductor Server - HTTP coordinator for the Conductor runtime
//!
//! Wires the service registry and the configured workflows into an axum
//! server and exposes them over HTTP.

use conductor_core::{
    EchoStepExecutor, LoggingEventHandler, ServiceEntry, ServiceRegistry, StepExecutor, WorkflowRunner,
};
use std::sync::Arc;
use tracing::info;

/// API module
pub mod api;

/// Configuration module
pub mod config;

/// Registry dashboard rendering
pub mod dashboard;

/// Step executor that calls registered services
pub mod dispatch;

/// Error module
pub mod error;

/// Server module
pub mod server;

// Re-export key types
pub use config::{LogFormat, ServerConfig, WorkflowExecutorKind};
pub use dispatch::ServiceDispatchExecutor;
pub use error::{ServerError, ServerResult};
pub use server::ConductorServer;

/// Run function
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    // Initialize logging
    init_logging(&config);

    let server = build_server(config)?;
    server.run().await
}

/// Build a server from configuration: seed the registry, then load every
/// configured workflow
pub fn build_server(config: ServerConfig) -> ServerResult<ConductorServer> {
    let registry = Arc::new(create_registry(&config)?);
    let workflows = create_workflows(&config, registry.clone())?;
    ConductorServer::new(config, registry, workflows)
}

/// Initialize logging
pub fn init_logging(config: &ServerConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let result = match config.log_format {
        LogFormat::Json => fmt().json().with_env_filter(filter).with_target(true).try_init(),
        LogFormat::Pretty => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}

/// Create the registry from the built-in services and the seed file
fn create_registry(config: &ServerConfig) -> ServerResult<ServiceRegistry> {
    let mut seed: Vec<ServiceEntry> = Vec::new();

    if config.seed_default_services {
        seed.extend(config::default_services());
    }
    if let Some(path) = &config.registry_seed_file {
        seed.extend(config::load_seed_file(path)?);
    }

    let registry = ServiceRegistry::with_seed(seed)?;
    Ok(registry)
}

/// Create one runner per configured workflow file
fn create_workflows(config: &ServerConfig, registry: Arc<ServiceRegistry>) -> ServerResult<Vec<WorkflowRunner>> {
    let executor: Arc<dyn StepExecutor> = match config.workflow_executor {
        WorkflowExecutorKind::Echo => Arc::new(EchoStepExecutor),
        WorkflowExecutorKind::Dispatch => {
            Arc::new(ServiceDispatchExecutor::new(registry, config.dispatch_timeout())?)
        }
    };

    let mut runners = Vec::with_capacity(config.workflow_files.len());
    for path in &config.workflow_files {
        let definition = config::load_workflow_file(path)?;
        let mut runner = WorkflowRunner::new(definition, executor.clone())?
            .with_event_handler(Arc::new(LoggingEventHandler));
        if let Some(timeout) = config.step_timeout() {
            runner = runner.with_step_timeout(timeout);
        }
        runners.push(runner);
    }

    info!(
        count = runners.len(),
        executor = %config.workflow_executor,
        "Loaded workflows"
    );
    Ok(runners)
}
