use crate::CoreError;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Value object: Step ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(id: &str) -> Self {
        StepId(id.to_string())
    }
}

/// Value object: Execution ID, one per workflow run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    /// Generate a fresh execution id
    pub fn generate() -> Self {
        ExecutionId(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_required() -> bool {
    true
}

fn default_workflow_name() -> String {
    "Unknown".to_string()
}

fn default_workflow_version() -> String {
    "1.0.0".to_string()
}

/// Represents a step in a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// ID of the step, unique within its workflow
    pub id: StepId,

    /// Whether the default predicate runs this step
    #[serde(default = "default_required")]
    pub required: bool,

    /// Step-specific parameters understood by the executing adapter
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl StepDefinition {
    /// Create a required step with an empty payload
    pub fn new(id: &str) -> Self {
        Self {
            id: StepId::from(id),
            required: true,
            payload: Map::new(),
        }
    }

    /// Create an optional step with an empty payload
    pub fn optional(id: &str) -> Self {
        Self {
            required: false,
            ..Self::new(id)
        }
    }

    /// Add a payload parameter
    pub fn with_param(mut self, key: &str, value: Value) -> Self {
        self.payload.insert(key.to_string(), value);
        self
    }

    /// Look up a payload parameter
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Look up a string payload parameter
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Routing rules used to pick an adapter for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRules {
    /// Top-level request field whose string value selects the route
    pub field: String,

    /// Field value to adapter label
    #[serde(default)]
    pub routes: HashMap<String, String>,

    /// Adapter used when no route matches
    pub fallback: String,
}

/// A named, ordered list of steps loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Name used as the workflow label in outcomes
    #[serde(default = "default_workflow_name")]
    pub name: String,

    /// Definition version
    #[serde(default = "default_workflow_version")]
    pub version: String,

    /// Description of the workflow
    #[serde(default)]
    pub description: Option<String>,

    /// The steps, in execution order
    #[serde(default)]
    pub steps: Vec<StepDefinition>,

    /// Optional adapter routing rules
    #[serde(default)]
    pub routing: Option<RoutingRules>,
}

impl WorkflowDefinition {
    /// Create a definition with default version and no routing rules
    pub fn new(name: &str, steps: Vec<StepDefinition>) -> Self {
        Self {
            name: name.to_string(),
            version: default_workflow_version(),
            description: None,
            steps,
            routing: None,
        }
    }

    /// Validate the workflow definition
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut step_ids = HashSet::new();
        for step in &self.steps {
            if step.id.0.trim().is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "Workflow '{}' contains a step with an empty id",
                    self.name
                )));
            }
            if !step_ids.insert(&step.id) {
                return Err(CoreError::ValidationError(format!(
                    "Duplicate step ID: {}",
                    step.id
                )));
            }
        }
        Ok(())
    }
}

/// Mutable state of one workflow execution.
///
/// Created fresh per run and owned by that run alone; `results` only grows.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowContext {
    /// Execution ID
    pub execution_id: ExecutionId,

    /// Workflow name
    pub workflow: String,

    /// The original request, opaque to the runner
    pub request: Value,

    /// Adapter selected for this execution
    pub adapter: String,

    results: BTreeMap<StepId, Value>,
}

impl WorkflowContext {
    /// Create a context with empty results
    pub fn new(workflow: &str, request: Value, adapter: String) -> Self {
        Self {
            execution_id: ExecutionId::generate(),
            workflow: workflow.to_string(),
            request,
            adapter,
            results: BTreeMap::new(),
        }
    }

    /// Result of a completed step
    pub fn result(&self, step_id: &str) -> Option<&Value> {
        self.results.get(&StepId::from(step_id))
    }

    /// All results so far
    pub fn results(&self) -> &BTreeMap<StepId, Value> {
        &self.results
    }

    pub(crate) fn record(&mut self, step_id: StepId, result: Value) {
        self.results.insert(step_id, result);
    }

    pub(crate) fn into_results(self) -> BTreeMap<StepId, Value> {
        self.results
    }
}

fn serialize_error_message<S: Serializer>(error: &CoreError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&error.detail())
}

/// Outcome of one workflow execution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkflowOutcome {
    /// Every step completed or was skipped
    Success {
        /// Workflow name
        workflow: String,
        /// Execution ID
        execution_id: ExecutionId,
        /// Result of every executed step
        results: BTreeMap<StepId, Value>,
    },

    /// A step failed or the run was cancelled
    #[serde(rename = "error")]
    Failure {
        /// Workflow name
        workflow: String,
        /// Execution ID
        execution_id: ExecutionId,
        /// Step that failed, or that would have run next when cancelled
        failed_step: Option<StepId>,
        /// What went wrong
        #[serde(rename = "error_message", serialize_with = "serialize_error_message")]
        error: CoreError,
        /// Results accumulated before the failure
        partial_results: BTreeMap<StepId, Value>,
    },
}

impl WorkflowOutcome {
    /// Whether the execution succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowOutcome::Success { .. })
    }

    /// Whether the execution stopped because it was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            WorkflowOutcome::Failure {
                error: CoreError::Cancelled(_),
                ..
            }
        )
    }

    /// Workflow name label
    pub fn workflow(&self) -> &str {
        match self {
            WorkflowOutcome::Success { workflow, .. } | WorkflowOutcome::Failure { workflow, .. } => {
                workflow
            }
        }
    }

    /// Execution ID
    pub fn execution_id(&self) -> &ExecutionId {
        match self {
            WorkflowOutcome::Success { execution_id, .. }
            | WorkflowOutcome::Failure { execution_id, .. } => execution_id,
        }
    }

    /// Results produced, complete on success and partial on failure
    pub fn results(&self) -> &BTreeMap<StepId, Value> {
        match self {
            WorkflowOutcome::Success { results, .. } => results,
            WorkflowOutcome::Failure { partial_results, .. } => partial_results,
        }
    }

    /// The error, when the execution failed
    pub fn error(&self) -> Option<&CoreError> {
        match self {
            WorkflowOutcome::Success { .. } => None,
            WorkflowOutcome::Failure { error, .. } => Some(error),
        }
    }
}
