//! Workflow engine: dependency-ordered execution of a workflow's task graph.
//!
//! The `WorkflowEngine` loads a workflow's tasks, validates them into a
//! [`TaskGraph`], and walks the graph with an explicit worklist. A task is
//! dispatched once every prerequisite has completed; independent ready tasks
//! run concurrently on a `tokio::JoinSet`, optionally bounded by a semaphore.
//!
//! # Execution flow
//!
//! 1. Create the `WorkflowExecution` record in RUNNING.
//! 2. Load the workflow and tasks, build the graph (errors fail the run).
//! 3. Seed the ready set with tasks that have no prerequisites.
//! 4. Each dispatched task runs through the retry/timeout guard.
//! 5. Successes release dependents; failures block transitive dependents.
//! 6. Finalize COMPLETED or FAILED with the accumulated result map.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use bizbrain_types::config::{EngineConfig, FailurePolicy};
use bizbrain_types::workflow::WorkflowExecution;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::http::BoxHttpClient;
use crate::llm::box_client::BoxLlmClient;
use crate::repository::workflow::WorkflowRepository;

use super::context::ExecutionContext;
use super::graph::TaskGraph;
use super::guard::{RetryPolicy, RetryTimeoutGuard, TaskFailure};
use super::recorder::ExecutionRecorder;
use super::task_runner::TaskRunner;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors surfaced by engine control operations.
///
/// `execute_workflow` itself never fails: every internal problem becomes a
/// FAILED execution.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No running execution with this id (unknown or already finished).
    #[error("execution not found or not running: {0}")]
    ExecutionNotFound(Uuid),
}

/// Why a run ended FAILED, with whatever results were produced before.
struct RunFailure {
    message: String,
    results: BTreeMap<String, Value>,
}

impl RunFailure {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            results: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Executes workflows stored in a `WorkflowRepository`.
pub struct WorkflowEngine<R: WorkflowRepository> {
    recorder: Arc<ExecutionRecorder<R>>,
    runner: Arc<TaskRunner<R>>,
    max_concurrency: Option<usize>,
    failure_policy: FailurePolicy,
    /// Cancellation tokens keyed by execution id, present while running.
    cancellation_tokens: DashMap<Uuid, CancellationToken>,
}

impl<R: WorkflowRepository + 'static> WorkflowEngine<R> {
    pub fn new(
        repo: R,
        llm: Arc<BoxLlmClient>,
        http: Arc<BoxHttpClient>,
        config: &EngineConfig,
    ) -> Self {
        let recorder = Arc::new(ExecutionRecorder::new(repo));
        let guard = RetryTimeoutGuard::new(Arc::clone(&recorder), RetryPolicy::from(&config.retry));
        Self {
            recorder,
            runner: Arc::new(TaskRunner::new(llm, http, guard)),
            max_concurrency: config.max_concurrency,
            failure_policy: config.failure_policy,
            cancellation_tokens: DashMap::new(),
        }
    }

    /// The recorder (and through it the repository) this engine writes to.
    pub fn recorder(&self) -> &ExecutionRecorder<R> {
        &self.recorder
    }

    /// Run a workflow to a terminal state and return the finalized record.
    pub async fn execute_workflow(
        &self,
        workflow_id: Uuid,
        user_id: Uuid,
        input_data: Option<Value>,
    ) -> WorkflowExecution {
        let execution = self.begin(workflow_id, user_id, input_data).await;
        self.run(execution).await
    }

    /// Create and persist a RUNNING execution without walking the graph yet.
    ///
    /// The execution is cancellable from this point on. Pair with [`run`].
    ///
    /// [`run`]: Self::run
    pub async fn begin(
        &self,
        workflow_id: Uuid,
        user_id: Uuid,
        input_data: Option<Value>,
    ) -> WorkflowExecution {
        let execution = WorkflowExecution::start(workflow_id, user_id, input_data);
        self.cancellation_tokens
            .insert(execution.id, CancellationToken::new());
        self.recorder.execution_started(&execution).await;

        tracing::info!(
            execution_id = %execution.id,
            workflow_id = %workflow_id,
            "starting workflow execution"
        );
        execution
    }

    /// Walk the graph of a begun execution and finalize it.
    pub async fn run(&self, mut execution: WorkflowExecution) -> WorkflowExecution {
        let token = self
            .cancellation_tokens
            .entry(execution.id)
            .or_default()
            .clone();
        let started = std::time::Instant::now();

        let outcome = self.drive(&execution, &token).await;
        self.cancellation_tokens.remove(&execution.id);

        match outcome {
            Ok(results) => {
                let tasks = results.len();
                self.recorder
                    .execution_completed(&mut execution, results)
                    .await;
                tracing::info!(
                    execution_id = %execution.id,
                    tasks,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "workflow execution completed"
                );
            }
            Err(failure) => {
                self.recorder
                    .execution_failed(&mut execution, &failure.message, failure.results)
                    .await;
                tracing::warn!(
                    execution_id = %execution.id,
                    error = failure.message.as_str(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "workflow execution failed"
                );
            }
        }
        execution
    }

    /// Cancel a running execution: nothing new is dispatched, in-flight
    /// attempts are dropped, and the execution ends FAILED.
    pub fn cancel(&self, execution_id: Uuid) -> Result<(), EngineError> {
        let token = self
            .cancellation_tokens
            .get(&execution_id)
            .map(|entry| entry.value().clone())
            .ok_or(EngineError::ExecutionNotFound(execution_id))?;
        token.cancel();
        tracing::info!(execution_id = %execution_id, "workflow execution cancellation requested");
        Ok(())
    }

    /// Load, validate, and walk the graph. `Ok` carries the full result map.
    async fn drive(
        &self,
        execution: &WorkflowExecution,
        token: &CancellationToken,
    ) -> Result<BTreeMap<String, Value>, RunFailure> {
        let repo = self.recorder.repo();
        let workflow_id = execution.workflow_id;

        let workflow = match repo.get_workflow(&workflow_id).await {
            Ok(Some(workflow)) => workflow,
            Ok(None) => {
                return Err(RunFailure::new(format!(
                    "workflow '{workflow_id}' not found"
                )));
            }
            Err(e) => return Err(RunFailure::new(format!("failed to load workflow: {e}"))),
        };
        let tasks = repo
            .list_tasks(&workflow_id)
            .await
            .map_err(|e| RunFailure::new(format!("failed to load tasks: {e}")))?;
        let graph = TaskGraph::build(tasks).map_err(|e| RunFailure::new(e.to_string()))?;

        tracing::debug!(
            execution_id = %execution.id,
            workflow = workflow.name.as_str(),
            tasks = graph.len(),
            "task graph built"
        );

        self.walk(execution, Arc::new(graph), token).await
    }

    async fn walk(
        &self,
        execution: &WorkflowExecution,
        graph: Arc<TaskGraph>,
        token: &CancellationToken,
    ) -> Result<BTreeMap<String, Value>, RunFailure> {
        let execution_id = execution.id;
        let input = execution.input_data.clone().unwrap_or(Value::Null);
        let order = graph.topological_order();

        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(pos, id)| (id.as_str(), pos))
            .collect();
        let mut pending: HashMap<&str, usize> = order
            .iter()
            .map(|id| (id.as_str(), graph.prerequisites(id).len()))
            .collect();
        let mut ready: BTreeSet<(usize, &str)> = pending
            .iter()
            .filter(|(_, remaining)| **remaining == 0)
            .map(|(id, _)| (position[id], *id))
            .collect();

        let results: DashMap<String, Value> = DashMap::new();
        let semaphore = self
            .max_concurrency
            .filter(|limit| *limit > 0)
            .map(|limit| Arc::new(Semaphore::new(limit)));
        let mut dispatched: HashSet<&str> = HashSet::new();
        let mut blocked: BTreeSet<String> = BTreeSet::new();
        let mut first_failure: Option<String> = None;
        let mut halted = false;
        let mut in_flight: JoinSet<(String, Result<Value, TaskFailure>)> = JoinSet::new();

        loop {
            if token.is_cancelled() {
                return Err(self.cancelled(execution_id, &mut in_flight, &results).await);
            }

            while !halted {
                let Some((_, id)) = ready.pop_first() else {
                    break;
                };
                if blocked.contains(id) || !dispatched.insert(id) {
                    continue;
                }
                let Some(task) = graph.task(id).cloned() else {
                    continue;
                };
                let prerequisites: BTreeMap<String, Value> = graph
                    .prerequisites(id)
                    .iter()
                    .filter_map(|p| results.get(p).map(|r| (p.clone(), r.value().clone())))
                    .collect();
                let ctx = ExecutionContext::new(
                    execution_id,
                    input.clone(),
                    prerequisites,
                    Arc::clone(&graph),
                );
                let runner = Arc::clone(&self.runner);
                let semaphore = semaphore.clone();

                tracing::debug!(execution_id = %execution_id, task_id = id, "dispatching task");
                in_flight.spawn(async move {
                    // Permit released on drop.
                    let _permit = match semaphore {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    let outcome = runner.run(&task, &ctx).await;
                    (task.id, outcome)
                });
            }

            if in_flight.is_empty() {
                break;
            }

            // `None` here means cancelled; the loop head finalizes it.
            let joined = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                joined = in_flight.join_next() => joined,
            };
            let Some(joined) = joined else {
                continue;
            };

            match joined {
                Ok((task_id, Ok(value))) => {
                    results.insert(task_id.clone(), value);
                    for dependent in graph.dependents(&task_id) {
                        let Some((&key, &pos)) = position.get_key_value(dependent.as_str()) else {
                            continue;
                        };
                        let Some(remaining) = pending.get_mut(key) else {
                            continue;
                        };
                        *remaining = remaining.saturating_sub(1);
                        if *remaining == 0 && !blocked.contains(key) {
                            ready.insert((pos, key));
                        }
                    }
                }
                Ok((task_id, Err(failure))) => {
                    let downstream = graph.transitive_dependents(&task_id);
                    if !downstream.is_empty() {
                        tracing::info!(
                            execution_id = %execution_id,
                            task_id = task_id.as_str(),
                            blocked = downstream.len(),
                            "blocking dependents of failed task"
                        );
                    }
                    blocked.extend(downstream);
                    first_failure.get_or_insert_with(|| failure.to_string());
                    if self.failure_policy == FailurePolicy::HaltDispatch {
                        halted = true;
                    }
                }
                Err(e) => {
                    tracing::error!(execution_id = %execution_id, error = %e, "task join error");
                    first_failure.get_or_insert_with(|| format!("task join error: {e}"));
                    halted = true;
                }
            }
        }

        let results = snapshot(&results);
        match first_failure {
            Some(message) => Err(RunFailure { message, results }),
            None => Ok(results),
        }
    }

    async fn cancelled(
        &self,
        execution_id: Uuid,
        in_flight: &mut JoinSet<(String, Result<Value, TaskFailure>)>,
        results: &DashMap<String, Value>,
    ) -> RunFailure {
        in_flight.abort_all();
        // Completions that raced the abort still count.
        while let Some(joined) = in_flight.join_next().await {
            if let Ok((task_id, Ok(value))) = joined {
                results.insert(task_id, value);
            }
        }
        tracing::info!(execution_id = %execution_id, "workflow execution cancelled");
        RunFailure {
            message: "execution cancelled".to_string(),
            results: snapshot(results),
        }
    }
}

fn snapshot(results: &DashMap<String, Value>) -> BTreeMap<String, Value> {
    results
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bizbrain_types::http::{HttpError, HttpRequest, HttpResponse};
    use bizbrain_types::llm::LlmError;

    use crate::http::HttpClient;
    use crate::llm::client::LlmClient;
    use crate::repository::memory::InMemoryWorkflowRepository;

    struct NoLlm;

    impl LlmClient for NoLlm {
        fn name(&self) -> &str {
            "none"
        }

        async fn complete(&self, _: &str, _: &str, _: f64, _: u32) -> Result<String, LlmError> {
            Err(LlmError::Unsupported("complete".to_string()))
        }

        async fn embed(&self, _: &str) -> Result<Vec<f32>, LlmError> {
            Err(LlmError::Unsupported("embed".to_string()))
        }

        async fn sentiment(&self, _: &str, _: &str) -> Result<Value, LlmError> {
            Err(LlmError::Unsupported("sentiment".to_string()))
        }

        async fn entities(&self, _: &str, _: &str) -> Result<Value, LlmError> {
            Err(LlmError::Unsupported("entities".to_string()))
        }

        async fn summarize(&self, _: &str, _: &str, _: u32) -> Result<Value, LlmError> {
            Err(LlmError::Unsupported("summarize".to_string()))
        }
    }

    struct NoHttp;

    impl HttpClient for NoHttp {
        async fn request(&self, _: HttpRequest) -> Result<HttpResponse, HttpError> {
            Err(HttpError::Transport("offline".to_string()))
        }
    }

    fn engine() -> WorkflowEngine<InMemoryWorkflowRepository> {
        WorkflowEngine::new(
            InMemoryWorkflowRepository::new(),
            Arc::new(BoxLlmClient::new(NoLlm)),
            Arc::new(BoxHttpClient::new(NoHttp)),
            &EngineConfig::default(),
        )
    }

    #[test]
    fn engine_error_display() {
        let err = EngineError::ExecutionNotFound(Uuid::nil());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn cancel_unknown_execution_fails() {
        let engine = engine();
        assert!(matches!(
            engine.cancel(Uuid::now_v7()),
            Err(EngineError::ExecutionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_workflow_fails_execution() {
        let engine = engine();
        let workflow_id = Uuid::now_v7();
        let exec = engine
            .execute_workflow(workflow_id, Uuid::nil(), None)
            .await;
        assert_eq!(exec.status, bizbrain_types::workflow::ExecutionStatus::Failed);
        assert_eq!(
            exec.error_message,
            Some(format!("workflow '{workflow_id}' not found"))
        );
        // Finished executions are no longer cancellable.
        assert!(engine.cancel(exec.id).is_err());
    }
}
