//! Workflow domain types for BizBrain.
//!
//! Defines the long-lived workflow/task shapes (edited through external CRUD or
//! imported from bundles), the typed per-kind task configuration the engine
//! validates before running anything, and the per-run execution tracking types
//! (`WorkflowExecution`, `TaskLog`).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::TaskConfigError;

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A named, user-owned collection of tasks.
///
/// The engine only ever reads workflows; `config` is opaque to it (graph
/// editor metadata and the like).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub config: Value,
    /// Owning user.
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Task definition (storage boundary)
// ---------------------------------------------------------------------------

/// The kind of a task. Closed set: every kind has its own executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Llm,
    Api,
    Condition,
    Loop,
    Parallel,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Llm => "llm",
            TaskKind::Api => "api",
            TaskKind::Condition => "condition",
            TaskKind::Loop => "loop",
            TaskKind::Parallel => "parallel",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llm" => Ok(TaskKind::Llm),
            "api" => Ok(TaskKind::Api),
            "condition" => Ok(TaskKind::Condition),
            "loop" => Ok(TaskKind::Loop),
            "parallel" => Ok(TaskKind::Parallel),
            other => Err(format!("invalid task kind: '{other}'")),
        }
    }
}

/// A single task of a workflow, as stored.
///
/// `config` is untyped JSON here; [`TaskConfig::from_definition`] validates it
/// against the per-kind schema before the engine makes any attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Task ID, unique within its workflow (e.g. "summarize").
    pub id: String,
    pub workflow_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub config: Value,
    /// Advisory ordering hint among independent tasks (lower runs first).
    #[serde(default)]
    pub order: i32,
    /// Task IDs this task depends on.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Per-task override of the engine retry/timeout policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryOverride>,
}

impl TaskDefinition {
    /// IDs of the tasks this task runs as sub-tasks (Loop body, Parallel branches).
    ///
    /// Lenient on purpose: malformed configs yield no references here and are
    /// reported as config errors when the task is dispatched.
    pub fn sub_task_refs(&self) -> Vec<String> {
        match self.kind {
            TaskKind::Loop => self
                .config
                .get("task_id")
                .or_else(|| self.config.get("loop_task_id"))
                .and_then(Value::as_str)
                .map(|id| vec![id.to_string()])
                .unwrap_or_default(),
            TaskKind::Parallel => self
                .config
                .get("task_ids")
                .and_then(Value::as_array)
                .map(|ids| {
                    ids.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            TaskKind::Llm | TaskKind::Api | TaskKind::Condition => Vec::new(),
        }
    }
}

/// Per-task retry/timeout override. Unset fields fall back to the engine policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Typed task configuration
// ---------------------------------------------------------------------------

/// Validated, kind-specific task configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskConfig {
    Llm(LlmTaskConfig),
    Api(ApiTaskConfig),
    Condition(ConditionTaskConfig),
    Loop(LoopTaskConfig),
    Parallel(ParallelTaskConfig),
}

impl TaskConfig {
    /// Validate a stored task's untyped config against its kind's schema.
    pub fn from_definition(task: &TaskDefinition) -> Result<Self, TaskConfigError> {
        Self::parse(task.kind, &task.config)
    }

    /// Validate an untyped config blob for the given kind.
    pub fn parse(kind: TaskKind, raw: &Value) -> Result<Self, TaskConfigError> {
        let config = match kind {
            TaskKind::Llm => TaskConfig::Llm(decode(kind, raw)?),
            TaskKind::Api => {
                let api: ApiTaskConfig = decode(kind, raw)?;
                api.validate()?;
                TaskConfig::Api(api)
            }
            TaskKind::Condition => {
                let cond: ConditionTaskConfig = decode(kind, raw)?;
                if cond.condition.trim().is_empty() {
                    return Err(TaskConfigError::missing(kind, "condition"));
                }
                TaskConfig::Condition(cond)
            }
            TaskKind::Loop => {
                let lp: LoopTaskConfig = decode(kind, raw)?;
                lp.validate()?;
                TaskConfig::Loop(lp)
            }
            TaskKind::Parallel => {
                let par: ParallelTaskConfig = decode(kind, raw)?;
                par.validate()?;
                TaskConfig::Parallel(par)
            }
        };
        Ok(config)
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            TaskConfig::Llm(_) => TaskKind::Llm,
            TaskConfig::Api(_) => TaskKind::Api,
            TaskConfig::Condition(_) => TaskKind::Condition,
            TaskConfig::Loop(_) => TaskKind::Loop,
            TaskConfig::Parallel(_) => TaskKind::Parallel,
        }
    }

    /// Loop and Parallel tasks only orchestrate sub-tasks, which carry their
    /// own retry/timeout budget.
    pub fn is_container(&self) -> bool {
        matches!(self, TaskConfig::Loop(_) | TaskConfig::Parallel(_))
    }
}

fn decode<T: DeserializeOwned>(kind: TaskKind, raw: &Value) -> Result<T, TaskConfigError> {
    // A task stored without any config is treated as an empty object so the
    // per-field defaults and "missing field" errors apply uniformly.
    let raw = if raw.is_null() {
        Value::Object(Default::default())
    } else {
        raw.clone()
    };
    serde_json::from_value(raw).map_err(|e| TaskConfigError::Invalid {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

/// Language-model operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmOperation {
    Completion,
    Embedding,
    Sentiment,
    Entities,
    Summary,
}

impl LlmOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmOperation::Completion => "completion",
            LlmOperation::Embedding => "embedding",
            LlmOperation::Sentiment => "sentiment",
            LlmOperation::Entities => "entities",
            LlmOperation::Summary => "summary",
        }
    }
}

impl fmt::Display for LlmOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmTaskConfig {
    pub operation: LlmOperation,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Summary length budget (summary operation only).
    #[serde(default = "default_max_length")]
    pub max_length: u32,
    /// Field of the input payload holding the text to operate on.
    #[serde(default = "default_input_field")]
    pub input_field: String,
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_max_length() -> u32 {
    200
}

fn default_input_field() -> String {
    "text".to_string()
}

/// HTTP methods accepted by API tasks.
pub const ALLOWED_HTTP_METHODS: &[&str] =
    &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiTaskConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// JSON body sent with the request (absent for bodyless requests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl ApiTaskConfig {
    fn validate(&self) -> Result<(), TaskConfigError> {
        match self.url.as_deref() {
            Some(url) if !url.trim().is_empty() => {}
            _ => return Err(TaskConfigError::missing(TaskKind::Api, "url")),
        }
        let method = self.method.to_uppercase();
        if !ALLOWED_HTTP_METHODS.contains(&method.as_str()) {
            return Err(TaskConfigError::Invalid {
                kind: TaskKind::Api.to_string(),
                reason: format!("unsupported HTTP method '{}'", self.method),
            });
        }
        Ok(())
    }

    /// The validated URL. Only call on a config produced by [`TaskConfig::parse`].
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTaskConfig {
    #[serde(default)]
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub false_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopTaskConfig {
    /// Sub-task run once per item.
    #[serde(default, alias = "loop_task_id")]
    pub task_id: String,
    /// Literal items to iterate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Value>>,
    /// Field path (e.g. `input.records`) resolved at run time to an array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_from: Option<String>,
}

impl LoopTaskConfig {
    fn validate(&self) -> Result<(), TaskConfigError> {
        if self.task_id.trim().is_empty() {
            return Err(TaskConfigError::missing(TaskKind::Loop, "task_id"));
        }
        match (&self.items, &self.items_from) {
            (Some(_), Some(_)) => Err(TaskConfigError::Invalid {
                kind: TaskKind::Loop.to_string(),
                reason: "`items` and `items_from` are mutually exclusive".to_string(),
            }),
            (None, None) => Err(TaskConfigError::missing(TaskKind::Loop, "items")),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelTaskConfig {
    #[serde(default)]
    pub task_ids: Vec<String>,
}

impl ParallelTaskConfig {
    fn validate(&self) -> Result<(), TaskConfigError> {
        if self.task_ids.is_empty() {
            return Err(TaskConfigError::missing(TaskKind::Parallel, "task_ids"));
        }
        let mut seen = std::collections::HashSet::new();
        for id in &self.task_ids {
            if !seen.insert(id.as_str()) {
                return Err(TaskConfigError::Invalid {
                    kind: TaskKind::Parallel.to_string(),
                    reason: format!("task '{id}' listed more than once"),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Execution status
// ---------------------------------------------------------------------------

/// Overall status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExecutionStatus::Pending),
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(format!("invalid execution status: '{other}'")),
        }
    }
}

/// Status of a single task within one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("invalid task status: '{other}'")),
        }
    }
}

/// Classification of a task failure, carried on failed task logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// Invalid task configuration or input. Never retried.
    Config,
    /// A collaborator call failed. Retryable.
    Execution,
    /// An attempt exceeded its wall-clock budget. Retryable.
    Timeout,
}

impl TaskErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskErrorKind::Config => "config",
            TaskErrorKind::Execution => "execution",
            TaskErrorKind::Timeout => "timeout",
        }
    }
}

impl FromStr for TaskErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "config" => Ok(TaskErrorKind::Config),
            "execution" => Ok(TaskErrorKind::Execution),
            "timeout" => Ok(TaskErrorKind::Timeout),
            other => Err(format!("invalid task error kind: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution records
// ---------------------------------------------------------------------------

/// One run of a workflow for one invoking user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// UUIDv7 execution ID.
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub user_id: Uuid,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data: Option<Value>,
    /// Task ID -> task result for every task that completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WorkflowExecution {
    /// A fresh execution record in `Running` state, started now.
    pub fn start(workflow_id: Uuid, user_id: Uuid, input_data: Option<Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            workflow_id,
            user_id,
            status: ExecutionStatus::Running,
            input_data,
            result: None,
            error_message: None,
            started_at: Some(now),
            completed_at: None,
            created_at: now,
        }
    }
}

/// One append-only row of an execution's task timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLog {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub task_id: String,
    pub status: TaskStatus,
    /// Attempt number (1-based).
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<TaskErrorKind>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
