use crate::domain::workflow::{RoutingRules, StepDefinition, WorkflowContext};
use crate::CoreError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Adapter chosen when nothing more specific applies
pub const DEFAULT_ADAPTER: &str = "local_model_mcp";

/// Performs the effect of a single step.
///
/// The runner awaits each call to completion before starting the next step;
/// implementations may suspend, call out over the network, or fail.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Execute `step` against the current context and return its result
    async fn execute(&self, step: &StepDefinition, context: &WorkflowContext) -> Result<Value, CoreError>;
}

/// Decides whether a step runs
pub trait StepPredicate: Send + Sync {
    /// Return false to skip the step
    fn should_execute(&self, step: &StepDefinition, context: &WorkflowContext) -> bool;
}

impl<F> StepPredicate for F
where
    F: Fn(&StepDefinition, &WorkflowContext) -> bool + Send + Sync,
{
    fn should_execute(&self, step: &StepDefinition, context: &WorkflowContext) -> bool {
        self(step, context)
    }
}

/// Picks the adapter label for a request, once per execution
pub trait AdapterSelector: Send + Sync {
    /// Select an adapter for the request
    fn select_adapter(&self, request: &Value) -> String;
}

/// Runs exactly the steps marked `required`
#[derive(Debug, Default, Clone, Copy)]
pub struct RequiredStepPredicate;

impl StepPredicate for RequiredStepPredicate {
    fn should_execute(&self, step: &StepDefinition, _context: &WorkflowContext) -> bool {
        step.required
    }
}

/// Always selects [`DEFAULT_ADAPTER`]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAdapterSelector;

impl AdapterSelector for DefaultAdapterSelector {
    fn select_adapter(&self, _request: &Value) -> String {
        DEFAULT_ADAPTER.to_string()
    }
}

/// Selects an adapter from the value of one top-level request field
#[derive(Debug, Clone)]
pub struct RoutingAdapterSelector {
    field: String,
    routes: HashMap<String, String>,
    fallback: String,
}

impl RoutingAdapterSelector {
    /// Build a selector from routing rules
    pub fn from_rules(rules: &RoutingRules) -> Self {
        Self {
            field: rules.field.clone(),
            routes: rules.routes.clone(),
            fallback: rules.fallback.clone(),
        }
    }
}

impl AdapterSelector for RoutingAdapterSelector {
    fn select_adapter(&self, request: &Value) -> String {
        request
            .get(&self.field)
            .and_then(Value::as_str)
            .and_then(|key| self.routes.get(key))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Executor that performs no work and reports the step as completed
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoStepExecutor;

#[async_trait]
impl StepExecutor for EchoStepExecutor {
    async fn execute(&self, step: &StepDefinition, _context: &WorkflowContext) -> Result<Value, CoreError> {
        Ok(json!({
            "status": "completed",
            "step": step.id.as_str(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(request: Value) -> WorkflowContext {
        WorkflowContext::new("test", request, DEFAULT_ADAPTER.to_string())
    }

    #[test]
    fn test_required_predicate() {
        let ctx = context(json!({}));
        assert!(RequiredStepPredicate.should_execute(&StepDefinition::new("a"), &ctx));
        assert!(!RequiredStepPredicate.should_execute(&StepDefinition::optional("b"), &ctx));
    }

    #[test]
    fn test_closure_predicate() {
        let ctx = context(json!({"skip": "b"}));
        let predicate = |step: &StepDefinition, ctx: &WorkflowContext| {
            ctx.request["skip"].as_str() != Some(step.id.as_str())
        };
        assert!(predicate.should_execute(&StepDefinition::new("a"), &ctx));
        assert!(!predicate.should_execute(&StepDefinition::new("b"), &ctx));
    }

    #[test]
    fn test_default_adapter_selector() {
        assert_eq!(DefaultAdapterSelector.select_adapter(&json!({"any": 1})), "local_model_mcp");
    }

    #[test]
    fn test_routing_adapter_selector() {
        let mut routes = HashMap::new();
        routes.insert("architecture".to_string(), "ARCHITECTURE DESIGN_MCP".to_string());
        let selector = RoutingAdapterSelector::from_rules(&RoutingRules {
            field: "task_type".to_string(),
            routes,
            fallback: "local_model_mcp".to_string(),
        });

        assert_eq!(
            selector.select_adapter(&json!({"task_type": "architecture"})),
            "ARCHITECTURE DESIGN_MCP"
        );
        assert_eq!(selector.select_adapter(&json!({"task_type": "other"})), "local_model_mcp");
        assert_eq!(selector.select_adapter(&json!({"task_type": 7})), "local_model_mcp");
        assert_eq!(selector.select_adapter(&json!("not an object")), "local_model_mcp");
    }

    #[tokio::test]
    async fn test_echo_executor() {
        let ctx = context(json!({}));
        let result = EchoStepExecutor
            .execute(&StepDefinition::new("design"), &ctx)
            .await
            .unwrap();
        assert_eq!(result, json!({"status": "completed", "step": "design"}));
    }
}
