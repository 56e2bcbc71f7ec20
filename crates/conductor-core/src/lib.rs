//!
//! Conductor Core - Service registry and workflow runner
//!
//! This crate holds the two pieces of state the Conductor coordinator is
//! built around: a directory of backend services that other components look
//! up by name, and a runner that executes a fixed, ordered list of steps
//! against a request. Transport, configuration and the actual network calls
//! live in `conductor-server`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - registry entries, workflow definitions and events
pub mod domain;

/// Application services - registry and runner
pub mod application;

/// Error types
pub mod error;

// Re-export key types
pub use error::CoreError;

pub use application::service_registry::{RegistrationOutcome, Registered, ServiceRegistry};
pub use application::workflow_runner::{
    DomainEventHandler, LoggingEventHandler, NoopEventHandler, WorkflowRunner,
};

pub use domain::events::DomainEvent;
pub use domain::service::{MetadataValue, ServiceEntry, ServiceName, ServiceRegistration, ServiceStatus};
pub use domain::step::{
    AdapterSelector, DefaultAdapterSelector, EchoStepExecutor, RequiredStepPredicate,
    RoutingAdapterSelector, StepExecutor, StepPredicate, DEFAULT_ADAPTER,
};
pub use domain::workflow::{
    ExecutionId, RoutingRules, StepDefinition, StepId, WorkflowContext, WorkflowDefinition,
    WorkflowOutcome,
};

// Cancellation handle accepted by `WorkflowRunner::execute_with_cancellation`
pub use tokio_util::sync::CancellationToken;
