//! Retry/timeout guard around every task attempt.
//!
//! The guard validates a task's config, then runs it through a
//! [`TaskExecutor`] with a hard per-attempt wall-clock timeout, retrying
//! retryable failures with exponential backoff. Loop and Parallel tasks get a
//! single attempt with no timeout; their sub-tasks are guarded individually.
//! Every attempt is recorded before control returns to the caller.

use std::sync::Arc;
use std::time::Duration;

use bizbrain_types::config::RetrySettings;
use bizbrain_types::workflow::{RetryOverride, TaskConfig, TaskDefinition, TaskErrorKind};
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::repository::workflow::WorkflowRepository;

use super::context::ExecutionContext;
use super::recorder::ExecutionRecorder;

/// Upper bound on a single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(3600);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a single task attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// Invalid configuration or input. Terminal, never retried.
    #[error("config error: {0}")]
    Config(String),

    /// A collaborator call failed. Retryable.
    #[error("execution error: {0}")]
    Execution(String),

    /// The attempt exceeded its wall-clock budget. Retryable.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl TaskError {
    pub fn kind(&self) -> TaskErrorKind {
        match self {
            TaskError::Config(_) => TaskErrorKind::Config,
            TaskError::Execution(_) => TaskErrorKind::Execution,
            TaskError::Timeout { .. } => TaskErrorKind::Timeout,
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, TaskError::Config(_))
    }
}

/// Terminal outcome of a guarded task: retries exhausted or a config error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task '{task_id}' failed after {attempts} attempt(s): {error}")]
pub struct TaskFailure {
    pub task_id: String,
    pub attempts: u32,
    pub error: TaskError,
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Retry/timeout parameters for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            retry_delay: Duration::from_secs(settings.retry_delay_secs),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

impl RetryPolicy {
    /// Apply a per-task override; unset fields keep this policy's values.
    pub fn with_override(self, over: Option<&RetryOverride>) -> Self {
        let Some(over) = over else {
            return self;
        };
        Self {
            max_retries: over.max_retries.unwrap_or(self.max_retries),
            retry_delay: over
                .retry_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(self.retry_delay),
            timeout: over
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(self.timeout),
        }
    }

    /// Total attempts allowed: the first one plus `max_retries`.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the next attempt after `failures` failed attempts so far
    /// (0-based): `retry_delay * 2^failures`, capped at [`MAX_BACKOFF`].
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 2u32.checked_pow(failures).unwrap_or(u32::MAX);
        self.retry_delay
            .checked_mul(factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

// ---------------------------------------------------------------------------
// TaskExecutor
// ---------------------------------------------------------------------------

/// Runs a single attempt of a task whose config is already validated.
///
/// Returns a boxed future so containers (Loop, Parallel) can recurse into the
/// guard for their sub-tasks.
pub trait TaskExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        task: &'a TaskDefinition,
        config: &'a TaskConfig,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, TaskError>>;
}

// ---------------------------------------------------------------------------
// RetryTimeoutGuard
// ---------------------------------------------------------------------------

/// Applies the retry/timeout policy and records every attempt.
pub struct RetryTimeoutGuard<R: WorkflowRepository> {
    recorder: Arc<ExecutionRecorder<R>>,
    policy: RetryPolicy,
}

impl<R: WorkflowRepository> RetryTimeoutGuard<R> {
    pub fn new(recorder: Arc<ExecutionRecorder<R>>, policy: RetryPolicy) -> Self {
        Self { recorder, policy }
    }

    /// The engine-wide policy (before per-task overrides).
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run `task` to a terminal outcome.
    pub async fn run<E>(
        &self,
        executor: &E,
        task: &TaskDefinition,
        ctx: &ExecutionContext,
    ) -> Result<Value, TaskFailure>
    where
        E: TaskExecutor + ?Sized,
    {
        let execution_id = ctx.execution_id();
        let item = ctx.item_index();
        let policy = self.policy.with_override(task.retry.as_ref());

        let config = match TaskConfig::from_definition(task) {
            Ok(config) => config,
            Err(e) => {
                let error = TaskError::Config(e.to_string());
                self.recorder.task_started(execution_id, &task.id, item, 1).await;
                self.recorder
                    .task_failed(execution_id, &task.id, item, 1, &error)
                    .await;
                tracing::warn!(
                    execution_id = %execution_id,
                    task_id = task.id.as_str(),
                    error = %error,
                    "task config rejected"
                );
                return Err(TaskFailure {
                    task_id: task.id.clone(),
                    attempts: 1,
                    error,
                });
            }
        };

        // Sub-task failures are data in a container's result, never its error.
        let container = config.is_container();
        let max_attempts = if container { 1 } else { policy.max_attempts() };
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.recorder
                .task_started(execution_id, &task.id, item, attempt)
                .await;

            let outcome = if container {
                executor.execute(task, &config, ctx).await
            } else {
                match tokio::time::timeout(policy.timeout, executor.execute(task, &config, ctx)).await
                {
                    Ok(result) => result,
                    Err(_elapsed) => Err(TaskError::Timeout {
                        secs: policy.timeout.as_secs(),
                    }),
                }
            };

            let error = match outcome {
                Ok(value) => {
                    self.recorder
                        .task_completed(execution_id, &task.id, item, attempt, &value)
                        .await;
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                self.recorder
                    .task_failed(execution_id, &task.id, item, attempt, &error)
                    .await;
                tracing::warn!(
                    execution_id = %execution_id,
                    task_id = task.id.as_str(),
                    attempts = attempt,
                    error = %error,
                    "task failed"
                );
                return Err(TaskFailure {
                    task_id: task.id.clone(),
                    attempts: attempt,
                    error,
                });
            }

            let delay = policy.backoff(attempt - 1);
            self.recorder
                .task_retrying(execution_id, &task.id, item, attempt, &error, delay)
                .await;
            tracing::info!(
                execution_id = %execution_id,
                task_id = task.id.as_str(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "task attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
