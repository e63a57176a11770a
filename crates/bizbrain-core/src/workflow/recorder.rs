//! Execution recorder: the append-only task log plus execution status updates.
//!
//! Wraps `WorkflowRepository` with the transitions the engine and the guard
//! emit. Recording is best effort: a storage failure is logged with
//! `tracing::warn!` and swallowed so that persistence problems never change
//! the outcome of a run.

use std::collections::BTreeMap;
use std::time::Duration;

use bizbrain_types::error::RepositoryError;
use bizbrain_types::workflow::{ExecutionStatus, TaskLog, TaskStatus, WorkflowExecution};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::repository::workflow::WorkflowRepository;

use super::guard::TaskError;

// ---------------------------------------------------------------------------
// ExecutionRecorder
// ---------------------------------------------------------------------------

/// Records execution and task transitions.
///
/// Generic over `R: WorkflowRepository` so it works with any storage backend
/// (SQLite, in-memory, etc.).
pub struct ExecutionRecorder<R: WorkflowRepository> {
    repo: R,
}

impl<R: WorkflowRepository> ExecutionRecorder<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // -----------------------------------------------------------------------
    // Task-level records
    // -----------------------------------------------------------------------

    /// Append one task log row.
    pub async fn record(&self, log: TaskLog) {
        if let Err(e) = self.repo.append_task_log(&log).await {
            tracing::warn!(
                execution_id = %log.execution_id,
                task_id = log.task_id.as_str(),
                status = %log.status,
                error = %e,
                "failed to record task log"
            );
        }
    }

    /// `item` is the Loop iteration the attempt belongs to, if any. It
    /// prefixes the log message so repeated sub-task trails stay apart.
    pub async fn task_started(
        &self,
        execution_id: Uuid,
        task_id: &str,
        item: Option<usize>,
        attempt: u32,
    ) {
        let mut log = entry(execution_id, task_id, attempt, TaskStatus::Running);
        log.message = Some(message(item, format!("attempt {attempt} started")));
        self.record(log).await;
        tracing::debug!(execution_id = %execution_id, task_id, attempt, "task attempt started");
    }

    pub async fn task_completed(
        &self,
        execution_id: Uuid,
        task_id: &str,
        item: Option<usize>,
        attempt: u32,
        result: &Value,
    ) {
        let mut log = entry(execution_id, task_id, attempt, TaskStatus::Completed);
        log.message = Some(message(item, "task completed".to_string()));
        log.result = Some(result.clone());
        self.record(log).await;
        tracing::debug!(execution_id = %execution_id, task_id, attempt, "task completed");
    }

    /// A failed attempt that will be retried. The task stays RUNNING.
    pub async fn task_retrying(
        &self,
        execution_id: Uuid,
        task_id: &str,
        item: Option<usize>,
        attempt: u32,
        error: &TaskError,
        delay: Duration,
    ) {
        let mut log = entry(execution_id, task_id, attempt, TaskStatus::Running);
        log.message = Some(message(
            item,
            format!("attempt {attempt} failed, retrying in {}s", delay.as_secs_f64()),
        ));
        log.error_message = Some(error.to_string());
        log.error_kind = Some(error.kind());
        self.record(log).await;
    }

    /// The terminal failure of a task.
    pub async fn task_failed(
        &self,
        execution_id: Uuid,
        task_id: &str,
        item: Option<usize>,
        attempt: u32,
        error: &TaskError,
    ) {
        let mut log = entry(execution_id, task_id, attempt, TaskStatus::Failed);
        log.message = Some(message(item, "task failed".to_string()));
        log.error_message = Some(error.to_string());
        log.error_kind = Some(error.kind());
        self.record(log).await;
    }

    // -----------------------------------------------------------------------
    // Execution-level records
    // -----------------------------------------------------------------------

    /// Persist a freshly started execution.
    pub async fn execution_started(&self, execution: &WorkflowExecution) {
        if let Err(e) = self.repo.create_execution(execution).await {
            tracing::warn!(
                execution_id = %execution.id,
                error = %e,
                "failed to record execution start"
            );
        }
    }

    /// Finalize an execution as COMPLETED with the full result map.
    pub async fn execution_completed(
        &self,
        execution: &mut WorkflowExecution,
        results: BTreeMap<String, Value>,
    ) {
        execution.status = ExecutionStatus::Completed;
        execution.result = Some(results);
        execution.error_message = None;
        execution.completed_at = Some(Utc::now());
        self.persist(execution).await;
    }

    /// Finalize an execution as FAILED, keeping whatever results completed.
    pub async fn execution_failed(
        &self,
        execution: &mut WorkflowExecution,
        error: &str,
        results: BTreeMap<String, Value>,
    ) {
        execution.status = ExecutionStatus::Failed;
        execution.result = Some(results);
        execution.error_message = Some(error.to_string());
        execution.completed_at = Some(Utc::now());
        self.persist(execution).await;
    }

    async fn persist(&self, execution: &WorkflowExecution) {
        if let Err(e) = self.repo.update_execution(execution).await {
            tracing::warn!(
                execution_id = %execution.id,
                status = %execution.status,
                error = %e,
                "failed to record execution status"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The ordered task log trail of an execution.
    pub async fn timeline(&self, execution_id: Uuid) -> Result<Vec<TaskLog>, RepositoryError> {
        self.repo.list_task_logs(&execution_id).await
    }
}

fn message(item: Option<usize>, text: String) -> String {
    match item {
        Some(index) => format!("item {index}: {text}"),
        None => text,
    }
}

fn entry(execution_id: Uuid, task_id: &str, attempt: u32, status: TaskStatus) -> TaskLog {
    TaskLog {
        id: Uuid::now_v7(),
        execution_id,
        task_id: task_id.to_string(),
        status,
        attempt,
        message: None,
        result: None,
        error_message: None,
        error_kind: None,
        created_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::InMemoryWorkflowRepository;
    use bizbrain_types::workflow::{TaskDefinition, TaskErrorKind, Workflow};
    use serde_json::json;

    /// A repository where every call fails.
    struct BrokenRepository;

    impl WorkflowRepository for BrokenRepository {
        async fn get_workflow(&self, _id: &Uuid) -> Result<Option<Workflow>, RepositoryError> {
            Err(RepositoryError::Connection)
        }

        async fn list_tasks(&self, _id: &Uuid) -> Result<Vec<TaskDefinition>, RepositoryError> {
            Err(RepositoryError::Connection)
        }

        async fn save_workflow(&self, _w: &Workflow) -> Result<(), RepositoryError> {
            Err(RepositoryError::Connection)
        }

        async fn save_tasks(&self, _id: &Uuid, _t: &[TaskDefinition]) -> Result<(), RepositoryError> {
            Err(RepositoryError::Connection)
        }

        async fn create_execution(&self, _e: &WorkflowExecution) -> Result<(), RepositoryError> {
            Err(RepositoryError::Connection)
        }

        async fn update_execution(&self, _e: &WorkflowExecution) -> Result<(), RepositoryError> {
            Err(RepositoryError::Connection)
        }

        async fn get_execution(&self, _id: &Uuid) -> Result<Option<WorkflowExecution>, RepositoryError> {
            Err(RepositoryError::Connection)
        }

        async fn list_executions(
            &self,
            _id: &Uuid,
            _limit: u32,
        ) -> Result<Vec<WorkflowExecution>, RepositoryError> {
            Err(RepositoryError::Connection)
        }

        async fn append_task_log(&self, _log: &TaskLog) -> Result<(), RepositoryError> {
            Err(RepositoryError::Query("disk full".to_string()))
        }

        async fn list_task_logs(&self, _id: &Uuid) -> Result<Vec<TaskLog>, RepositoryError> {
            Err(RepositoryError::Connection)
        }
    }

    #[tokio::test]
    async fn timeline_is_append_ordered() {
        let recorder = ExecutionRecorder::new(InMemoryWorkflowRepository::new());
        let exec_id = Uuid::now_v7();
        let err = TaskError::Execution("boom".to_string());

        recorder.task_started(exec_id, "t1", None, 1).await;
        recorder
            .task_retrying(exec_id, "t1", None, 1, &err, Duration::from_secs(5))
            .await;
        recorder.task_started(exec_id, "t1", None, 2).await;
        recorder.task_completed(exec_id, "t1", None, 2, &json!({"ok": true})).await;

        let logs = recorder.timeline(exec_id).await.unwrap();
        let trail: Vec<(TaskStatus, u32)> = logs.iter().map(|l| (l.status, l.attempt)).collect();
        assert_eq!(
            trail,
            vec![
                (TaskStatus::Running, 1),
                (TaskStatus::Running, 1),
                (TaskStatus::Running, 2),
                (TaskStatus::Completed, 2),
            ]
        );
        assert_eq!(logs[1].error_kind, Some(TaskErrorKind::Execution));
        assert_eq!(logs[1].error_message.as_deref(), Some("execution error: boom"));
        assert_eq!(logs[3].result, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn failed_log_carries_error_kind() {
        let recorder = ExecutionRecorder::new(InMemoryWorkflowRepository::new());
        let exec_id = Uuid::now_v7();
        recorder
            .task_failed(exec_id, "t1", None, 4, &TaskError::Timeout { secs: 2 })
            .await;
        let logs = recorder.timeline(exec_id).await.unwrap();
        assert_eq!(logs[0].status, TaskStatus::Failed);
        assert_eq!(logs[0].error_kind, Some(TaskErrorKind::Timeout));
        assert_eq!(logs[0].attempt, 4);
    }

    #[tokio::test]
    async fn execution_transitions_update_record() {
        let recorder = ExecutionRecorder::new(InMemoryWorkflowRepository::new());
        let mut exec = WorkflowExecution::start(Uuid::now_v7(), Uuid::nil(), None);
        recorder.execution_started(&exec).await;

        let mut partial = BTreeMap::new();
        partial.insert("a".to_string(), json!(1));
        recorder.execution_failed(&mut exec, "task 'b' failed", partial).await;

        let stored = recorder.repo().get_execution(&exec.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExecutionStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("task 'b' failed"));
        assert_eq!(stored.result.unwrap().len(), 1);
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn repository_errors_are_swallowed() {
        let recorder = ExecutionRecorder::new(BrokenRepository);
        let mut exec = WorkflowExecution::start(Uuid::now_v7(), Uuid::nil(), None);

        // None of these may panic or propagate.
        recorder.execution_started(&exec).await;
        recorder.task_started(exec.id, "t1", None, 1).await;
        recorder.task_completed(exec.id, "t1", None, 1, &json!(null)).await;
        recorder.execution_completed(&mut exec, BTreeMap::new()).await;

        assert_eq!(exec.status, ExecutionStatus::Completed);
        assert!(recorder.timeline(exec.id).await.is_err());
    }
}
