use async_trait::async_trait;
use conductor_core::{
    AdapterSelector, CancellationToken, CoreError, DomainEvent, DomainEventHandler, EchoStepExecutor,
    RoutingRules, StepDefinition, StepExecutor, StepId, WorkflowContext, WorkflowDefinition,
    WorkflowOutcome, WorkflowRunner,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every step it is asked to run; fails the steps listed in `failing`
#[derive(Default)]
struct ScriptedExecutor {
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn failing(steps: &[&str]) -> Self {
        Self {
            failing: steps.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StepExecutor for ScriptedExecutor {
    async fn execute(&self, step: &StepDefinition, context: &WorkflowContext) -> Result<Value, CoreError> {
        self.calls.lock().unwrap().push(step.id.0.clone());
        if self.failing.contains(&step.id.0) {
            return Err(CoreError::Other(format!("{} exploded", step.id)));
        }
        Ok(json!({
            "step": step.id.as_str(),
            "seen": context.results().len(),
        }))
    }
}

#[derive(Default)]
struct RecordingEventHandler {
    events: Mutex<Vec<String>>,
}

impl RecordingEventHandler {
    fn event_types(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl DomainEventHandler for RecordingEventHandler {
    async fn handle_event(&self, event: Box<dyn DomainEvent>) -> Result<(), CoreError> {
        self.events.lock().unwrap().push(event.event_type().to_string());
        Ok(())
    }
}

struct FailingEventHandler;

#[async_trait]
impl DomainEventHandler for FailingEventHandler {
    async fn handle_event(&self, _event: Box<dyn DomainEvent>) -> Result<(), CoreError> {
        Err(CoreError::ExternalDependencyError("event sink offline".to_string()))
    }
}

fn three_steps() -> WorkflowDefinition {
    WorkflowDefinition::new(
        "Release Pipeline",
        vec![
            StepDefinition::new("a"),
            StepDefinition::new("b"),
            StepDefinition::new("c"),
        ],
    )
}

fn step_ids(outcome: &WorkflowOutcome) -> Vec<String> {
    outcome.results().keys().map(|id| id.0.clone()).collect()
}

#[tokio::test]
async fn test_all_steps_succeed() {
    let executor = Arc::new(ScriptedExecutor::default());
    let runner = WorkflowRunner::new(three_steps(), executor.clone()).unwrap();

    let outcome = runner.execute(json!({"version": "1.2.0"})).await;

    assert!(outcome.is_success());
    assert_eq!(executor.calls(), vec!["a", "b", "c"]);
    assert_eq!(step_ids(&outcome), vec!["a", "b", "c"]);
    // Later steps see earlier results
    assert_eq!(outcome.results()[&StepId::from("c")]["seen"], json!(2));
}

#[tokio::test]
async fn test_failing_step_stops_execution() {
    let executor = Arc::new(ScriptedExecutor::failing(&["b"]));
    let runner = WorkflowRunner::new(three_steps(), executor.clone()).unwrap();

    let outcome = runner.execute(json!({})).await;

    assert_eq!(executor.calls(), vec!["a", "b"]);
    match &outcome {
        WorkflowOutcome::Failure {
            workflow,
            failed_step,
            error,
            partial_results,
            ..
        } => {
            assert_eq!(workflow, "Release Pipeline");
            assert_eq!(failed_step, &Some(StepId::from("b")));
            assert_eq!(
                error,
                &CoreError::StepExecutionFailure {
                    step_id: "b".to_string(),
                    message: "b exploded".to_string(),
                }
            );
            assert_eq!(partial_results.len(), 1);
            assert!(partial_results.contains_key(&StepId::from("a")));
        }
        other => panic!("Expected failure, got {:?}", other),
    }

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["status"], json!("error"));
    assert_eq!(value["error_message"], json!("b exploded"));
}

#[tokio::test]
async fn test_optional_step_is_skipped() {
    let definition = WorkflowDefinition::new(
        "Skip",
        vec![
            StepDefinition::new("a"),
            StepDefinition::optional("b"),
            StepDefinition::new("c"),
        ],
    );
    let executor = Arc::new(ScriptedExecutor::default());
    let runner = WorkflowRunner::new(definition, executor.clone()).unwrap();

    let outcome = runner.execute(json!({})).await;

    assert!(outcome.is_success());
    assert_eq!(executor.calls(), vec!["a", "c"]);
    assert_eq!(step_ids(&outcome), vec!["a", "c"]);
}

#[tokio::test]
async fn test_custom_predicate_reads_context() {
    let executor = Arc::new(ScriptedExecutor::default());
    let runner = WorkflowRunner::new(three_steps(), executor.clone())
        .unwrap()
        .with_step_predicate(Arc::new(|step: &StepDefinition, context: &WorkflowContext| {
            context.request["skip"].as_str() != Some(step.id.as_str())
        }));

    let outcome = runner.execute(json!({"skip": "b"})).await;

    assert!(outcome.is_success());
    assert_eq!(executor.calls(), vec!["a", "c"]);
}

#[tokio::test]
async fn test_runs_are_independent() {
    let runner = WorkflowRunner::new(three_steps(), Arc::new(EchoStepExecutor)).unwrap();

    let first = runner.execute(json!({"n": 1})).await;
    let second = runner.execute(json!({"n": 2})).await;

    assert_ne!(first.execution_id(), second.execution_id());
    assert_eq!(first.results(), second.results());
    assert_eq!(step_ids(&second), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_cancellation_between_steps() {
    struct CancelAfterFirst {
        token: CancellationToken,
    }

    #[async_trait]
    impl StepExecutor for CancelAfterFirst {
        async fn execute(&self, step: &StepDefinition, _context: &WorkflowContext) -> Result<Value, CoreError> {
            self.token.cancel();
            Ok(json!({"step": step.id.as_str()}))
        }
    }

    let token = CancellationToken::new();
    let events = Arc::new(RecordingEventHandler::default());
    let runner = WorkflowRunner::new(
        three_steps(),
        Arc::new(CancelAfterFirst { token: token.clone() }),
    )
    .unwrap()
    .with_event_handler(events.clone());

    let outcome = runner.execute_with_cancellation(json!({}), &token).await;

    assert!(outcome.is_cancelled());
    assert!(!outcome.is_success());
    assert_eq!(step_ids(&outcome), vec!["a"]);
    match &outcome {
        WorkflowOutcome::Failure { failed_step, .. } => {
            assert_eq!(failed_step, &Some(StepId::from("b")))
        }
        other => panic!("Expected failure, got {:?}", other),
    }
    assert_eq!(
        events.event_types(),
        vec!["workflow.started", "step.completed", "workflow.cancelled"]
    );
}

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() {
    let executor = Arc::new(ScriptedExecutor::default());
    let runner = WorkflowRunner::new(three_steps(), executor.clone()).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let outcome = runner.execute_with_cancellation(json!({}), &token).await;

    assert!(outcome.is_cancelled());
    assert!(executor.calls().is_empty());
    assert!(outcome.results().is_empty());
}

#[tokio::test]
async fn test_cancellation_reports_next_executed_step() {
    let definition = WorkflowDefinition::new(
        "Skip",
        vec![StepDefinition::optional("lint"), StepDefinition::new("build")],
    );
    let executor = Arc::new(ScriptedExecutor::default());
    let events = Arc::new(RecordingEventHandler::default());
    let runner = WorkflowRunner::new(definition, executor.clone())
        .unwrap()
        .with_event_handler(events.clone());
    let token = CancellationToken::new();
    token.cancel();

    let outcome = runner.execute_with_cancellation(json!({}), &token).await;

    assert!(outcome.is_cancelled());
    assert!(executor.calls().is_empty());
    match outcome {
        WorkflowOutcome::Failure { failed_step, error, .. } => {
            assert_eq!(failed_step, Some(StepId::from("build")));
            assert_eq!(error, CoreError::Cancelled("build".to_string()));
        }
        other => panic!("Expected failure, got {:?}", other),
    }
    assert_eq!(
        events.event_types(),
        vec!["workflow.started", "step.skipped", "workflow.cancelled"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_step_timeout_fails_step() {
    struct SlowExecutor;

    #[async_trait]
    impl StepExecutor for SlowExecutor {
        async fn execute(&self, step: &StepDefinition, _context: &WorkflowContext) -> Result<Value, CoreError> {
            if step.id.as_str() == "b" {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(json!({}))
        }
    }

    let runner = WorkflowRunner::new(three_steps(), Arc::new(SlowExecutor))
        .unwrap()
        .with_step_timeout(Duration::from_millis(500));

    let outcome = runner.execute(json!({})).await;

    match outcome {
        WorkflowOutcome::Failure {
            failed_step, error, ..
        } => {
            assert_eq!(failed_step, Some(StepId::from("b")));
            assert!(error.detail().contains("timed out after 500ms"));
        }
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_events_for_failed_run() {
    let events = Arc::new(RecordingEventHandler::default());
    let definition = WorkflowDefinition::new(
        "Events",
        vec![
            StepDefinition::new("a"),
            StepDefinition::optional("b"),
            StepDefinition::new("c"),
        ],
    );
    let runner = WorkflowRunner::new(definition, Arc::new(ScriptedExecutor::failing(&["c"])))
        .unwrap()
        .with_event_handler(events.clone());

    runner.execute(json!({})).await;

    assert_eq!(
        events.event_types(),
        vec![
            "workflow.started",
            "step.completed",
            "step.skipped",
            "step.failed",
            "workflow.failed",
        ]
    );
}

#[tokio::test]
async fn test_event_handler_errors_do_not_change_outcome() {
    let runner = WorkflowRunner::new(three_steps(), Arc::new(EchoStepExecutor))
        .unwrap()
        .with_event_handler(Arc::new(FailingEventHandler));

    let outcome = runner.execute(json!({})).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.results().len(), 3);
}

#[tokio::test]
async fn test_routing_rules_select_adapter() {
    struct AdapterEcho;

    #[async_trait]
    impl StepExecutor for AdapterEcho {
        async fn execute(&self, _step: &StepDefinition, context: &WorkflowContext) -> Result<Value, CoreError> {
            Ok(json!(context.adapter))
        }
    }

    let mut definition = WorkflowDefinition::new("Routed", vec![StepDefinition::new("design")]);
    let mut routes = HashMap::new();
    routes.insert("ui".to_string(), "SMART UI_MCP".to_string());
    definition.routing = Some(RoutingRules {
        field: "task_type".to_string(),
        routes,
        fallback: "KILOCODE MCP".to_string(),
    });
    let runner = WorkflowRunner::new(definition, Arc::new(AdapterEcho)).unwrap();

    let routed = runner.execute(json!({"task_type": "ui"})).await;
    let fallback = runner.execute(json!({"task_type": "backend"})).await;

    assert_eq!(routed.results()[&StepId::from("design")], json!("SMART UI_MCP"));
    assert_eq!(fallback.results()[&StepId::from("design")], json!("KILOCODE MCP"));
}

#[tokio::test]
async fn test_default_adapter_and_custom_selector() {
    struct Fixed;

    impl AdapterSelector for Fixed {
        fn select_adapter(&self, _request: &Value) -> String {
            "fixed".to_string()
        }
    }

    struct AdapterEcho;

    #[async_trait]
    impl StepExecutor for AdapterEcho {
        async fn execute(&self, _step: &StepDefinition, context: &WorkflowContext) -> Result<Value, CoreError> {
            Ok(json!(context.adapter))
        }
    }

    let definition = WorkflowDefinition::new("Adapters", vec![StepDefinition::new("a")]);
    let runner = WorkflowRunner::new(definition, Arc::new(AdapterEcho)).unwrap();
    let outcome = runner.execute(json!({})).await;
    assert_eq!(outcome.results()[&StepId::from("a")], json!("local_model_mcp"));

    let outcome = runner
        .with_adapter_selector(Arc::new(Fixed))
        .execute(json!({}))
        .await;
    assert_eq!(outcome.results()[&StepId::from("a")], json!("fixed"));
}

#[test]
fn test_duplicate_step_ids_are_rejected() {
    let definition = WorkflowDefinition::new(
        "Broken",
        vec![StepDefinition::new("a"), StepDefinition::new("a")],
    );

    match WorkflowRunner::new(definition, Arc::new(EchoStepExecutor)) {
        Err(CoreError::ValidationError(msg)) => assert!(msg.contains("Duplicate step ID: a")),
        other => panic!("Expected ValidationError, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_concurrent_executions_share_runner() {
    let runner = WorkflowRunner::new(three_steps(), Arc::new(EchoStepExecutor)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let runner = runner.clone();
            tokio::spawn(async move { runner.execute(json!({"n": i})).await })
        })
        .collect();

    for handle in handles {
        let outcome = handle.await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.results().len(), 3);
    }
}
