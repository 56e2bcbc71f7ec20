use crate::domain::workflow::{ExecutionId, StepId};
use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Domain event trait for all events in the system
pub trait DomainEvent: Debug + Send + Sync {
    /// Returns the type of the event as a string
    fn event_type(&self) -> &'static str;

    /// Returns the execution this event belongs to
    fn execution_id(&self) -> &ExecutionId;

    /// Returns the timestamp when the event occurred
    fn timestamp(&self) -> DateTime<Utc>;
}

macro_rules! impl_domain_event {
    ($event:ty, $name:literal) => {
        impl DomainEvent for $event {
            fn event_type(&self) -> &'static str {
                $name
            }

            fn execution_id(&self) -> &ExecutionId {
                &self.execution_id
            }

            fn timestamp(&self) -> DateTime<Utc> {
                self.timestamp
            }
        }
    };
}

/// Event: Workflow execution started
#[derive(Debug)]
pub struct WorkflowStarted {
    /// The execution
    pub execution_id: ExecutionId,
    /// Workflow name
    pub workflow: String,
    /// Adapter selected for the execution
    pub adapter: String,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}
impl_domain_event!(WorkflowStarted, "workflow.started");

/// Event: Step skipped by the predicate
#[derive(Debug)]
pub struct StepSkipped {
    /// The execution
    pub execution_id: ExecutionId,
    /// The skipped step
    pub step_id: StepId,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}
impl_domain_event!(StepSkipped, "step.skipped");

/// Event: Step completed
#[derive(Debug)]
pub struct StepCompleted {
    /// The execution
    pub execution_id: ExecutionId,
    /// The completed step
    pub step_id: StepId,
    /// Time spent in the executor
    pub duration_ms: u64,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}
impl_domain_event!(StepCompleted, "step.completed");

/// Event: Step failed
#[derive(Debug)]
pub struct StepFailed {
    /// The execution
    pub execution_id: ExecutionId,
    /// The failed step
    pub step_id: StepId,
    /// Error message
    pub error: String,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}
impl_domain_event!(StepFailed, "step.failed");

/// Event: Workflow execution completed
#[derive(Debug)]
pub struct WorkflowCompleted {
    /// The execution
    pub execution_id: ExecutionId,
    /// Number of steps that produced a result
    pub executed_steps: usize,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}
impl_domain_event!(WorkflowCompleted, "workflow.completed");

/// Event: Workflow execution failed
#[derive(Debug)]
pub struct WorkflowFailed {
    /// The execution
    pub execution_id: ExecutionId,
    /// Error message
    pub error: String,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}
impl_domain_event!(WorkflowFailed, "workflow.failed");

/// Event: Workflow execution cancelled between steps
#[derive(Debug)]
pub struct WorkflowCancelled {
    /// The execution
    pub execution_id: ExecutionId,
    /// Step that would have run next
    pub next_step: StepId,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}
impl_domain_event!(WorkflowCancelled, "workflow.cancelled");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let execution_id = ExecutionId("exec".to_string());
        let now = Utc::now();

        let events: Vec<Box<dyn DomainEvent>> = vec![
            Box::new(WorkflowStarted {
                execution_id: execution_id.clone(),
                workflow: "w".to_string(),
                adapter: "a".to_string(),
                timestamp: now,
            }),
            Box::new(StepSkipped {
                execution_id: execution_id.clone(),
                step_id: StepId::from("s"),
                timestamp: now,
            }),
            Box::new(StepCompleted {
                execution_id: execution_id.clone(),
                step_id: StepId::from("s"),
                duration_ms: 3,
                timestamp: now,
            }),
            Box::new(StepFailed {
                execution_id: execution_id.clone(),
                step_id: StepId::from("s"),
                error: "e".to_string(),
                timestamp: now,
            }),
            Box::new(WorkflowCompleted {
                execution_id: execution_id.clone(),
                executed_steps: 1,
                timestamp: now,
            }),
            Box::new(WorkflowFailed {
                execution_id: execution_id.clone(),
                error: "e".to_string(),
                timestamp: now,
            }),
            Box::new(WorkflowCancelled {
                execution_id: execution_id.clone(),
                next_step: StepId::from("s"),
                timestamp: now,
            }),
        ];

        let types: Vec<&str> = events.iter().map(|event| event.event_type()).collect();
        assert_eq!(
            types,
            vec![
                "workflow.started",
                "step.skipped",
                "step.completed",
                "step.failed",
                "workflow.completed",
                "workflow.failed",
                "workflow.cancelled",
            ]
        );
        assert!(events.iter().all(|event| event.execution_id() == &execution_id));
        assert!(events.iter().all(|event| event.timestamp() == now));
    }
}
