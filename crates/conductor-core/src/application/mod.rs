/// Registry of backend services
pub mod service_registry;

/// Sequential workflow execution
pub mod workflow_runner;
