/// Service registry domain models
pub mod service;

/// Workflow definitions, contexts and outcomes
pub mod workflow;

/// Step execution capabilities
pub mod step;

/// Domain events
pub mod events;
