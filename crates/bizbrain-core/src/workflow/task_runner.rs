//! Task runner for all five task kinds.
//!
//! `TaskRunner` dispatches each attempt to the handler for its validated
//! `TaskConfig` variant. LLM and API tasks delegate to the injected
//! collaborators; Condition tasks evaluate a restricted expression; Loop and
//! Parallel tasks run their sub-tasks back through the retry/timeout guard.

use std::collections::HashMap;
use std::sync::Arc;

use bizbrain_types::http::HttpRequest;
use bizbrain_types::workflow::{
    ApiTaskConfig, ConditionTaskConfig, LlmOperation, LlmTaskConfig, LoopTaskConfig,
    ParallelTaskConfig, TaskConfig, TaskDefinition,
};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use serde_json::{Map, Value, json};

use crate::http::BoxHttpClient;
use crate::llm::box_client::BoxLlmClient;
use crate::repository::workflow::WorkflowRepository;

use super::context::ExecutionContext;
use super::expression::{Expression, ExpressionError};
use super::guard::{RetryTimeoutGuard, TaskError, TaskExecutor, TaskFailure};

/// Longest response body excerpt kept in an API error message.
const ERROR_BODY_EXCERPT: usize = 512;

// ---------------------------------------------------------------------------
// TaskRunner
// ---------------------------------------------------------------------------

/// Executes tasks by dispatching to kind-specific handlers.
pub struct TaskRunner<R: WorkflowRepository> {
    llm: Arc<BoxLlmClient>,
    http: Arc<BoxHttpClient>,
    guard: RetryTimeoutGuard<R>,
}

impl<R: WorkflowRepository> TaskRunner<R> {
    pub fn new(llm: Arc<BoxLlmClient>, http: Arc<BoxHttpClient>, guard: RetryTimeoutGuard<R>) -> Self {
        Self { llm, http, guard }
    }

    /// Run a task to a terminal outcome through the retry/timeout guard.
    pub async fn run(&self, task: &TaskDefinition, ctx: &ExecutionContext) -> Result<Value, TaskFailure> {
        self.guard.run(self, task, ctx).await
    }

    async fn dispatch(
        &self,
        task: &TaskDefinition,
        config: &TaskConfig,
        ctx: &ExecutionContext,
    ) -> Result<Value, TaskError> {
        tracing::debug!(
            execution_id = %ctx.execution_id(),
            task_id = task.id.as_str(),
            kind = %config.kind(),
            "dispatching task"
        );
        match config {
            TaskConfig::Llm(cfg) => self.run_llm(cfg, ctx).await,
            TaskConfig::Api(cfg) => self.run_api(cfg).await,
            TaskConfig::Condition(cfg) => run_condition(cfg, ctx),
            TaskConfig::Loop(cfg) => self.run_loop(cfg, ctx).await,
            TaskConfig::Parallel(cfg) => self.run_parallel(cfg, ctx).await,
        }
    }

    // -- LLM: one call to the language-model client --

    async fn run_llm(&self, cfg: &LlmTaskConfig, ctx: &ExecutionContext) -> Result<Value, TaskError> {
        let text = match ctx.lookup(&cfg.input_field).map_err(config_error)? {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::String(_)) | None => {
                return Err(TaskError::Config(format!(
                    "input field '{}' is missing or empty",
                    cfg.input_field
                )));
            }
            Some(other) => other.to_string(),
        };

        let model = cfg.model.as_str();
        let result = match cfg.operation {
            LlmOperation::Completion => self
                .llm
                .complete(&text, model, cfg.temperature, cfg.max_tokens)
                .await
                .map(Value::String),
            LlmOperation::Embedding => self.llm.embed(&text).await.map(|v| json!(v)),
            LlmOperation::Sentiment => self.llm.sentiment(&text, model).await,
            LlmOperation::Entities => self.llm.entities(&text, model).await,
            LlmOperation::Summary => self.llm.summarize(&text, model, cfg.max_length).await,
        }
        .map_err(|e| TaskError::Execution(format!("{} {}: {e}", self.llm.name(), cfg.operation)))?;

        Ok(json!({
            "operation": cfg.operation,
            "model": cfg.model,
            "result": result,
        }))
    }

    // -- API: one outbound HTTP request --

    async fn run_api(&self, cfg: &ApiTaskConfig) -> Result<Value, TaskError> {
        let request = HttpRequest {
            method: cfg.method.to_uppercase(),
            url: cfg.url().to_string(),
            headers: cfg.headers.clone(),
            body: cfg.body.clone(),
        };
        tracing::debug!(method = request.method.as_str(), url = request.url.as_str(), "sending API request");

        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| TaskError::Execution(e.to_string()))?;

        if !response.is_success() {
            let excerpt: String = response.body.chars().take(ERROR_BODY_EXCERPT).collect();
            return Err(TaskError::Execution(format!(
                "HTTP {}: {}",
                response.status, excerpt
            )));
        }
        Ok(response.json_body())
    }

    // -- Loop: the sub-task once per item, sequentially --

    async fn run_loop(&self, cfg: &LoopTaskConfig, ctx: &ExecutionContext) -> Result<Value, TaskError> {
        let items = match (&cfg.items, &cfg.items_from) {
            (Some(items), _) => items.clone(),
            (None, Some(path)) => match ctx.lookup(path).map_err(config_error)? {
                Some(Value::Array(items)) => items,
                None => Vec::new(),
                Some(other) => {
                    return Err(TaskError::Config(format!(
                        "items_from '{path}' resolved to {}, expected an array",
                        kind_of(&other)
                    )));
                }
            },
            (None, None) => Vec::new(),
        };
        let sub_task = sub_task(ctx, &cfg.task_id)?;

        let mut results = Vec::with_capacity(items.len());
        let mut failed = 0usize;
        for (index, item) in items.into_iter().enumerate() {
            let item_ctx = ctx.for_item(index, item.clone());
            let mut entry = Map::new();
            entry.insert("index".to_string(), json!(index));
            entry.insert("item".to_string(), item);
            match self.guard.run(self, sub_task, &item_ctx).await {
                Ok(value) => {
                    entry.insert("status".to_string(), json!("completed"));
                    entry.insert("result".to_string(), value);
                }
                Err(failure) => {
                    failed += 1;
                    entry.insert("status".to_string(), json!("failed"));
                    entry.insert("error".to_string(), json!(failure.to_string()));
                }
            }
            results.push(Value::Object(entry));
        }

        Ok(json!({
            "completed": results.len() - failed,
            "failed": failed,
            "results": results,
        }))
    }

    // -- Parallel: every sub-task concurrently, all outcomes awaited --

    async fn run_parallel(
        &self,
        cfg: &ParallelTaskConfig,
        ctx: &ExecutionContext,
    ) -> Result<Value, TaskError> {
        let tasks = cfg
            .task_ids
            .iter()
            .map(|id| sub_task(ctx, id))
            .collect::<Result<Vec<_>, _>>()?;

        let branches: Vec<_> = tasks
            .iter()
            .copied()
            .map(|task| self.guard.run(self, task, ctx))
            .collect();
        let outcomes = join_all(branches).await;

        let mut results: HashMap<String, Value> = HashMap::with_capacity(outcomes.len());
        let mut failed = 0usize;
        for (task, outcome) in tasks.iter().zip(outcomes) {
            let entry = match outcome {
                Ok(value) => json!({ "status": "completed", "result": value }),
                Err(failure) => {
                    failed += 1;
                    json!({ "status": "failed", "error": failure.to_string() })
                }
            };
            results.insert(task.id.clone(), entry);
        }

        Ok(json!({
            "completed": results.len() - failed,
            "failed": failed,
            "results": results,
        }))
    }
}

impl<R: WorkflowRepository> TaskExecutor for TaskRunner<R> {
    fn execute<'a>(
        &'a self,
        task: &'a TaskDefinition,
        config: &'a TaskConfig,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, TaskError>> {
        self.dispatch(task, config, ctx).boxed()
    }
}

// -- Condition: restricted expression over the context --

fn run_condition(cfg: &ConditionTaskConfig, ctx: &ExecutionContext) -> Result<Value, TaskError> {
    let expr = Expression::parse(&cfg.condition).map_err(config_error)?;
    let result = expr
        .evaluate_bool(&ctx.scope())
        .map_err(|e| TaskError::Execution(e.to_string()))?;
    let branch = if result {
        cfg.true_branch.clone()
    } else {
        cfg.false_branch.clone()
    };

    tracing::debug!(
        condition = cfg.condition.as_str(),
        result,
        branch = branch.as_deref().unwrap_or("-"),
        "condition evaluated"
    );

    Ok(json!({
        "condition": cfg.condition,
        "result": result,
        "branch": branch,
    }))
}

fn sub_task<'a>(ctx: &'a ExecutionContext, id: &str) -> Result<&'a TaskDefinition, TaskError> {
    ctx.graph()
        .task(id)
        .ok_or_else(|| TaskError::Config(format!("sub-task '{id}' does not exist")))
}

fn config_error(e: ExpressionError) -> TaskError {
    TaskError::Config(e.to_string())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
