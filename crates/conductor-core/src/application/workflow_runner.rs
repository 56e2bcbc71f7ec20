use crate::{
    domain::events::{
        DomainEvent, StepCompleted, StepFailed, StepSkipped, WorkflowCancelled, WorkflowCompleted,
        WorkflowFailed, WorkflowStarted,
    },
    domain::step::{
        AdapterSelector, DefaultAdapterSelector, RequiredStepPredicate, RoutingAdapterSelector,
        StepExecutor, StepPredicate,
    },
    domain::workflow::{StepDefinition, WorkflowContext, WorkflowDefinition, WorkflowOutcome},
    CoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handler for domain events
#[async_trait]
pub trait DomainEventHandler: Send + Sync {
    /// Handle a domain event
    async fn handle_event(&self, event: Box<dyn DomainEvent>) -> Result<(), CoreError>;
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventHandler;

#[async_trait]
impl DomainEventHandler for NoopEventHandler {
    async fn handle_event(&self, _event: Box<dyn DomainEvent>) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Writes every event to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventHandler;

#[async_trait]
impl DomainEventHandler for LoggingEventHandler {
    async fn handle_event(&self, event: Box<dyn DomainEvent>) -> Result<(), CoreError> {
        info!(
            event_type = event.event_type(),
            execution_id = %event.execution_id(),
            timestamp = %event.timestamp(),
            event = ?event,
            "Workflow event"
        );
        Ok(())
    }
}

/// Executes a static, ordered list of steps against one request at a time.
///
/// A runner is immutable once built; every call to [`execute`](Self::execute)
/// gets its own [`WorkflowContext`], so one runner can serve concurrent
/// executions.
#[derive(Clone)]
pub struct WorkflowRunner {
    definition: Arc<WorkflowDefinition>,
    step_executor: Arc<dyn StepExecutor>,
    step_predicate: Arc<dyn StepPredicate>,
    adapter_selector: Arc<dyn AdapterSelector>,
    event_handler: Arc<dyn DomainEventHandler>,
    step_timeout: Option<Duration>,
}

impl std::fmt::Debug for WorkflowRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRunner")
            .field("workflow", &self.definition.name)
            .field("steps", &self.definition.steps.len())
            .field("step_timeout", &self.step_timeout)
            .finish()
    }
}

impl WorkflowRunner {
    /// Create a runner for a definition.
    ///
    /// The definition is validated here, so duplicate step ids are rejected
    /// before anything runs. Defaults: [`RequiredStepPredicate`], the
    /// definition's routing rules or [`DefaultAdapterSelector`], and
    /// [`NoopEventHandler`].
    pub fn new(definition: WorkflowDefinition, step_executor: Arc<dyn StepExecutor>) -> Result<Self, CoreError> {
        definition.validate()?;

        let adapter_selector: Arc<dyn AdapterSelector> = match &definition.routing {
            Some(rules) => Arc::new(RoutingAdapterSelector::from_rules(rules)),
            None => Arc::new(DefaultAdapterSelector),
        };

        Ok(Self {
            definition: Arc::new(definition),
            step_executor,
            step_predicate: Arc::new(RequiredStepPredicate),
            adapter_selector,
            event_handler: Arc::new(NoopEventHandler),
            step_timeout: None,
        })
    }

    /// Replace the step predicate
    pub fn with_step_predicate(mut self, step_predicate: Arc<dyn StepPredicate>) -> Self {
        self.step_predicate = step_predicate;
        self
    }

    /// Replace the adapter selector
    pub fn with_adapter_selector(mut self, adapter_selector: Arc<dyn AdapterSelector>) -> Self {
        self.adapter_selector = adapter_selector;
        self
    }

    /// Replace the event handler
    pub fn with_event_handler(mut self, event_handler: Arc<dyn DomainEventHandler>) -> Self {
        self.event_handler = event_handler;
        self
    }

    /// Bound each step's execution time; expiry fails the step
    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = Some(step_timeout);
        self
    }

    /// The workflow being run
    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    /// Workflow name label
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Execute every step in order against `request`
    pub async fn execute(&self, request: Value) -> WorkflowOutcome {
        self.execute_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Execute every step in order, stopping before the next step once
    /// `cancellation` fires. A step already running is always awaited.
    pub async fn execute_with_cancellation(
        &self,
        request: Value,
        cancellation: &CancellationToken,
    ) -> WorkflowOutcome {
        let adapter = self.adapter_selector.select_adapter(&request);
        let mut context = WorkflowContext::new(&self.definition.name, request, adapter);

        info!(
            workflow = %self.definition.name,
            execution_id = %context.execution_id,
            adapter = %context.adapter,
            steps = self.definition.steps.len(),
            "Starting workflow execution"
        );
        self.emit(Box::new(WorkflowStarted {
            execution_id: context.execution_id.clone(),
            workflow: self.definition.name.clone(),
            adapter: context.adapter.clone(),
            timestamp: Utc::now(),
        }))
        .await;

        for step in &self.definition.steps {
            if !self.step_predicate.should_execute(step, &context) {
                debug!(
                    execution_id = %context.execution_id,
                    step_id = %step.id,
                    "Skipping step"
                );
                self.emit(Box::new(StepSkipped {
                    execution_id: context.execution_id.clone(),
                    step_id: step.id.clone(),
                    timestamp: Utc::now(),
                }))
                .await;
                continue;
            }

            // Skipped steps never observe cancellation
            if cancellation.is_cancelled() {
                info!(
                    workflow = %self.definition.name,
                    execution_id = %context.execution_id,
                    next_step = %step.id,
                    "Workflow execution cancelled"
                );
                self.emit(Box::new(WorkflowCancelled {
                    execution_id: context.execution_id.clone(),
                    next_step: step.id.clone(),
                    timestamp: Utc::now(),
                }))
                .await;
                return self.failure(context, step, CoreError::Cancelled(step.id.0.clone()));
            }

            debug!(
                execution_id = %context.execution_id,
                step_id = %step.id,
                "Executing step"
            );
            let started = Instant::now();

            match self.run_step(step, &context).await {
                Ok(result) => {
                    let duration_ms = started.elapsed().as_millis() as u64;
                    debug!(
                        execution_id = %context.execution_id,
                        step_id = %step.id,
                        duration_ms,
                        "Step executed successfully"
                    );
                    context.record(step.id.clone(), result);
                    self.emit(Box::new(StepCompleted {
                        execution_id: context.execution_id.clone(),
                        step_id: step.id.clone(),
                        duration_ms,
                        timestamp: Utc::now(),
                    }))
                    .await;
                }
                Err(error) => {
                    let error = CoreError::StepExecutionFailure {
                        step_id: step.id.0.clone(),
                        message: error.detail(),
                    };
                    warn!(
                        workflow = %self.definition.name,
                        execution_id = %context.execution_id,
                        step_id = %step.id,
                        error = %error,
                        "Step execution failed"
                    );
                    self.emit(Box::new(StepFailed {
                        execution_id: context.execution_id.clone(),
                        step_id: step.id.clone(),
                        error: error.detail(),
                        timestamp: Utc::now(),
                    }))
                    .await;
                    self.emit(Box::new(WorkflowFailed {
                        execution_id: context.execution_id.clone(),
                        error: error.to_string(),
                        timestamp: Utc::now(),
                    }))
                    .await;
                    return self.failure(context, step, error);
                }
            }
        }

        let executed_steps = context.results().len();
        info!(
            workflow = %self.definition.name,
            execution_id = %context.execution_id,
            executed_steps,
            "Workflow execution completed"
        );
        self.emit(Box::new(WorkflowCompleted {
            execution_id: context.execution_id.clone(),
            executed_steps,
            timestamp: Utc::now(),
        }))
        .await;

        let execution_id = context.execution_id.clone();
        WorkflowOutcome::Success {
            workflow: self.definition.name.clone(),
            execution_id,
            results: context.into_results(),
        }
    }

    async fn run_step(&self, step: &StepDefinition, context: &WorkflowContext) -> Result<Value, CoreError> {
        let execution = self.step_executor.execute(step, context);
        match self.step_timeout {
            Some(limit) => tokio::time::timeout(limit, execution).await.map_err(|_| {
                CoreError::Other(format!("step timed out after {}ms", limit.as_millis()))
            })?,
            None => execution.await,
        }
    }

    fn failure(&self, context: WorkflowContext, step: &StepDefinition, error: CoreError) -> WorkflowOutcome {
        let execution_id = context.execution_id.clone();
        WorkflowOutcome::Failure {
            workflow: self.definition.name.clone(),
            execution_id,
            failed_step: Some(step.id.clone()),
            error,
            partial_results: context.into_results(),
        }
    }

    async fn emit(&self, event: Box<dyn DomainEvent>) {
        let event_type = event.event_type();
        if let Err(e) = self.event_handler.handle_event(event).await {
            warn!(event_type, error = %e, "Event handler failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step::EchoStepExecutor;
    use crate::domain::workflow::StepDefinition;
    use serde_json::json;

    #[tokio::test]
    async fn test_echo_workflow_succeeds() {
        let definition = WorkflowDefinition::new(
            "Requirements Analysis",
            vec![StepDefinition::new("parse"), StepDefinition::new("analyze")],
        );
        let runner = WorkflowRunner::new(definition, Arc::new(EchoStepExecutor)).unwrap();

        let outcome = runner.execute(json!({"requirement": "login page"})).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.workflow(), "Requirements Analysis");
        assert_eq!(outcome.results().len(), 2);
        assert_eq!(
            outcome.results().get(&crate::domain::workflow::StepId::from("analyze")),
            Some(&json!({"status": "completed", "step": "analyze"}))
        );
    }

    #[tokio::test]
    async fn test_empty_workflow_succeeds() {
        let runner =
            WorkflowRunner::new(WorkflowDefinition::new("empty", vec![]), Arc::new(EchoStepExecutor)).unwrap();
        let outcome = runner.execute(json!(null)).await;
        assert!(outcome.is_success());
        assert!(outcome.results().is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected_at_construction() {
        let definition = WorkflowDefinition::new("dup", vec![StepDefinition::new("a"), StepDefinition::new("a")]);
        let result = WorkflowRunner::new(definition, Arc::new(EchoStepExecutor));
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
    }
}
