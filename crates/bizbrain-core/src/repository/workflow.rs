//! Workflow repository trait definition.
//!
//! Defines the storage interface for workflows, their tasks, executions, and
//! the append-only task log. The infrastructure layer (bizbrain-infra)
//! implements this trait with SQLite persistence.

use bizbrain_types::error::RepositoryError;
use bizbrain_types::workflow::{TaskDefinition, TaskLog, Workflow, WorkflowExecution};
use uuid::Uuid;

/// Repository trait for workflow persistence.
///
/// Covers three entity families:
/// - **Workflows:** the workflow row and its task definitions (read by the
///   engine, written by the bundle importer).
/// - **Executions:** one row per run, created and mutated only by the engine.
/// - **Task logs:** append-only transition records for an execution.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait WorkflowRepository: Send + Sync {
    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    /// Get a workflow by its UUID.
    fn get_workflow(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Workflow>, RepositoryError>> + Send;

    /// List the tasks of a workflow, ordered by (`order`, id).
    fn list_tasks(
        &self,
        workflow_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<TaskDefinition>, RepositoryError>> + Send;

    /// Upsert a workflow (insert or replace by ID).
    fn save_workflow(
        &self,
        workflow: &Workflow,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Replace the full task set of a workflow.
    fn save_tasks(
        &self,
        workflow_id: &Uuid,
        tasks: &[TaskDefinition],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Executions
    // -----------------------------------------------------------------------

    /// Create a new execution record.
    fn create_execution(
        &self,
        execution: &WorkflowExecution,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrite the mutable fields of an execution (status, result, error, timestamps).
    fn update_execution(
        &self,
        execution: &WorkflowExecution,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get an execution by its UUID.
    fn get_execution(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowExecution>, RepositoryError>> + Send;

    /// List executions of a workflow, newest first.
    fn list_executions(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowExecution>, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Task logs
    // -----------------------------------------------------------------------

    /// Append a task log row. Rows are never updated.
    fn append_task_log(
        &self,
        log: &TaskLog,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List the task logs of an execution in insertion order.
    fn list_task_logs(
        &self,
        execution_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<TaskLog>, RepositoryError>> + Send;
}
