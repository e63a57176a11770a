//! SQLite workflow repository implementation.
//!
//! Implements `WorkflowRepository` from `bizbrain-core` using sqlx with split
//! read/write pools. JSON-valued columns (task config, execution input and
//! result, task log payloads) are stored as serialized text.

use std::collections::BTreeMap;

use bizbrain_core::repository::workflow::WorkflowRepository;
use bizbrain_types::error::RepositoryError;
use bizbrain_types::workflow::{
    ExecutionStatus, RetryOverride, TaskDefinition, TaskErrorKind, TaskKind, TaskLog, TaskStatus,
    Workflow, WorkflowExecution,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `WorkflowRepository`.
#[derive(Clone)]
pub struct SqliteWorkflowRepository {
    pool: DatabasePool,
}

impl SqliteWorkflowRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// List all workflows, by name.
    pub async fn list_workflows(&self) -> Result<Vec<Workflow>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM workflows ORDER BY name ASC, id ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let mut workflows = Vec::with_capacity(rows.len());
        for row in &rows {
            workflows.push(WorkflowRow::from_row(row).map_err(query_error)?.into_workflow()?);
        }
        Ok(workflows)
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct WorkflowRow {
    id: String,
    name: String,
    description: Option<String>,
    config: String,
    user_id: String,
    created_at: String,
}

impl WorkflowRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            config: row.try_get("config")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_workflow(self) -> Result<Workflow, RepositoryError> {
        Ok(Workflow {
            id: parse_uuid(&self.id)?,
            name: self.name,
            description: self.description,
            config: parse_json(&self.config, "workflow config")?,
            user_id: parse_uuid(&self.user_id)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct TaskRow {
    workflow_id: String,
    id: String,
    name: String,
    description: Option<String>,
    task_type: String,
    config: String,
    task_order: i64,
    depends_on: String,
    retry: Option<String>,
}

impl TaskRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            workflow_id: row.try_get("workflow_id")?,
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            task_type: row.try_get("task_type")?,
            config: row.try_get("config")?,
            task_order: row.try_get("task_order")?,
            depends_on: row.try_get("depends_on")?,
            retry: row.try_get("retry")?,
        })
    }

    fn into_task(self) -> Result<TaskDefinition, RepositoryError> {
        let kind: TaskKind = self
            .task_type
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let retry: Option<RetryOverride> = self
            .retry
            .as_deref()
            .map(|s| parse_json(s, "task retry"))
            .transpose()?;

        Ok(TaskDefinition {
            id: self.id,
            workflow_id: parse_uuid(&self.workflow_id)?,
            name: self.name,
            description: self.description,
            kind,
            config: parse_json(&self.config, "task config")?,
            order: i32::try_from(self.task_order)
                .map_err(|_| RepositoryError::Query(format!("task order out of range: {}", self.task_order)))?,
            depends_on: parse_json(&self.depends_on, "task depends_on")?,
            retry,
        })
    }
}

struct ExecutionRow {
    id: String,
    workflow_id: String,
    user_id: String,
    status: String,
    input_data: Option<String>,
    result: Option<String>,
    error_message: Option<String>,
    started_at: Option<String>,
    completed_at: Option<String>,
    created_at: String,
}

impl ExecutionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            user_id: row.try_get("user_id")?,
            status: row.try_get("status")?,
            input_data: row.try_get("input_data")?,
            result: row.try_get("result")?,
            error_message: row.try_get("error_message")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_execution(self) -> Result<WorkflowExecution, RepositoryError> {
        let status: ExecutionStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let result: Option<BTreeMap<String, Value>> = self
            .result
            .as_deref()
            .map(|s| parse_json(s, "execution result"))
            .transpose()?;

        Ok(WorkflowExecution {
            id: parse_uuid(&self.id)?,
            workflow_id: parse_uuid(&self.workflow_id)?,
            user_id: parse_uuid(&self.user_id)?,
            status,
            input_data: self
                .input_data
                .as_deref()
                .map(|s| parse_json(s, "execution input"))
                .transpose()?,
            result,
            error_message: self.error_message,
            started_at: self.started_at.as_deref().map(parse_datetime).transpose()?,
            completed_at: self.completed_at.as_deref().map(parse_datetime).transpose()?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct TaskLogRow {
    id: String,
    execution_id: String,
    task_id: String,
    status: String,
    attempt: i64,
    message: Option<String>,
    result: Option<String>,
    error_message: Option<String>,
    error_kind: Option<String>,
    created_at: String,
}

impl TaskLogRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            execution_id: row.try_get("execution_id")?,
            task_id: row.try_get("task_id")?,
            status: row.try_get("status")?,
            attempt: row.try_get("attempt")?,
            message: row.try_get("message")?,
            result: row.try_get("result")?,
            error_message: row.try_get("error_message")?,
            error_kind: row.try_get("error_kind")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_task_log(self) -> Result<TaskLog, RepositoryError> {
        let status: TaskStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let error_kind: Option<TaskErrorKind> = self
            .error_kind
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(TaskLog {
            id: parse_uuid(&self.id)?,
            execution_id: parse_uuid(&self.execution_id)?,
            task_id: self.task_id,
            status,
            attempt: u32::try_from(self.attempt)
                .map_err(|_| RepositoryError::Query(format!("invalid attempt: {}", self.attempt)))?,
            message: self.message,
            result: self
                .result
                .as_deref()
                .map(|s| parse_json(s, "task log result"))
                .transpose()?,
            error_message: self.error_message,
            error_kind,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_json<T: DeserializeOwned>(s: &str, what: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(s).map_err(|e| RepositoryError::Query(format!("invalid {what} JSON: {e}")))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Query(format!("serialize: {e}")))
}

// ---------------------------------------------------------------------------
// WorkflowRepository impl
// ---------------------------------------------------------------------------

impl WorkflowRepository for SqliteWorkflowRepository {
    async fn get_workflow(&self, id: &Uuid) -> Result<Option<Workflow>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let r = WorkflowRow::from_row(&row).map_err(query_error)?;
                Ok(Some(r.into_workflow()?))
            }
            None => Ok(None),
        }
    }

    async fn list_tasks(&self, workflow_id: &Uuid) -> Result<Vec<TaskDefinition>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM workflow_tasks WHERE workflow_id = ? ORDER BY task_order ASC, id ASC",
        )
        .bind(workflow_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in &rows {
            tasks.push(TaskRow::from_row(row).map_err(query_error)?.into_task()?);
        }
        Ok(tasks)
    }

    async fn save_workflow(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());

        sqlx::query(
            r#"INSERT INTO workflows (id, name, description, config, user_id, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 config = excluded.config,
                 user_id = excluded.user_id,
                 updated_at = excluded.updated_at"#,
        )
        .bind(workflow.id.to_string())
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(to_json(&workflow.config)?)
        .bind(workflow.user_id.to_string())
        .bind(format_datetime(&workflow.created_at))
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn save_tasks(
        &self,
        workflow_id: &Uuid,
        tasks: &[TaskDefinition],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        let exists = sqlx::query("SELECT 1 FROM workflows WHERE id = ?")
            .bind(workflow_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(query_error)?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM workflow_tasks WHERE workflow_id = ?")
            .bind(workflow_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;

        for task in tasks {
            let retry = task.retry.as_ref().map(to_json).transpose()?;
            sqlx::query(
                r#"INSERT INTO workflow_tasks
                   (workflow_id, id, name, description, task_type, config, task_order, depends_on, retry)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(workflow_id.to_string())
            .bind(&task.id)
            .bind(&task.name)
            .bind(&task.description)
            .bind(task.kind.as_str())
            .bind(to_json(&task.config)?)
            .bind(task.order as i64)
            .bind(to_json(&task.depends_on)?)
            .bind(&retry)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepositoryError::Conflict(format!("duplicate task id '{}'", task.id))
                }
                other => query_error(other),
            })?;
        }

        tx.commit().await.map_err(query_error)?;
        Ok(())
    }

    async fn create_execution(&self, execution: &WorkflowExecution) -> Result<(), RepositoryError> {
        let input = execution.input_data.as_ref().map(to_json).transpose()?;
        let result = execution.result.as_ref().map(to_json).transpose()?;

        sqlx::query(
            r#"INSERT INTO workflow_executions
               (id, workflow_id, user_id, status, input_data, result, error_message,
                started_at, completed_at, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(execution.id.to_string())
        .bind(execution.workflow_id.to_string())
        .bind(execution.user_id.to_string())
        .bind(execution.status.as_str())
        .bind(&input)
        .bind(&result)
        .bind(&execution.error_message)
        .bind(execution.started_at.as_ref().map(format_datetime))
        .bind(execution.completed_at.as_ref().map(format_datetime))
        .bind(format_datetime(&execution.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("execution {} already exists", execution.id))
            }
            other => query_error(other),
        })?;

        Ok(())
    }

    async fn update_execution(&self, execution: &WorkflowExecution) -> Result<(), RepositoryError> {
        let result = execution.result.as_ref().map(to_json).transpose()?;

        let updated = sqlx::query(
            r#"UPDATE workflow_executions
               SET status = ?, result = ?, error_message = ?, started_at = ?, completed_at = ?
               WHERE id = ?"#,
        )
        .bind(execution.status.as_str())
        .bind(&result)
        .bind(&execution.error_message)
        .bind(execution.started_at.as_ref().map(format_datetime))
        .bind(execution.completed_at.as_ref().map(format_datetime))
        .bind(execution.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_execution(&self, id: &Uuid) -> Result<Option<WorkflowExecution>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM workflow_executions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let r = ExecutionRow::from_row(&row).map_err(query_error)?;
                Ok(Some(r.into_execution()?))
            }
            None => Ok(None),
        }
    }

    async fn list_executions(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<WorkflowExecution>, RepositoryError> {
        // UUIDv7 ids sort by creation time, so `id` breaks created_at ties.
        let rows = sqlx::query(
            "SELECT * FROM workflow_executions WHERE workflow_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(workflow_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut executions = Vec::with_capacity(rows.len());
        for row in &rows {
            executions.push(ExecutionRow::from_row(row).map_err(query_error)?.into_execution()?);
        }
        Ok(executions)
    }

    async fn append_task_log(&self, log: &TaskLog) -> Result<(), RepositoryError> {
        let result = log.result.as_ref().map(to_json).transpose()?;

        sqlx::query(
            r#"INSERT INTO task_logs
               (id, execution_id, task_id, status, attempt, message, result,
                error_message, error_kind, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(log.id.to_string())
        .bind(log.execution_id.to_string())
        .bind(&log.task_id)
        .bind(log.status.as_str())
        .bind(log.attempt as i64)
        .bind(&log.message)
        .bind(&result)
        .bind(&log.error_message)
        .bind(log.error_kind.map(|k| k.as_str()))
        .bind(format_datetime(&log.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn list_task_logs(&self, execution_id: &Uuid) -> Result<Vec<TaskLog>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM task_logs WHERE execution_id = ? ORDER BY seq ASC")
            .bind(execution_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let mut logs = Vec::with_capacity(rows.len());
        for row in &rows {
            logs.push(TaskLogRow::from_row(row).map_err(query_error)?.into_task_log()?);
        }
        Ok(logs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::DatabasePool;
    use serde_json::json;

    async fn test_repo() -> SqliteWorkflowRepository {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        SqliteWorkflowRepository::new(DatabasePool::new(&url).await.unwrap())
    }

    fn sample_workflow() -> Workflow {
        Workflow {
            id: Uuid::now_v7(),
            name: "lead-scoring".to_string(),
            description: Some("Score inbound leads".to_string()),
            config: json!({ "layout": { "x": 10 } }),
            user_id: Uuid::now_v7(),
            created_at: Utc::now(),
        }
    }

    fn task(workflow_id: Uuid, id: &str, kind: TaskKind, order: i32) -> TaskDefinition {
        TaskDefinition {
            id: id.to_string(),
            workflow_id,
            name: format!("Task {id}"),
            description: None,
            kind,
            config: json!({ "condition": "true" }),
            order,
            depends_on: vec![],
            retry: None,
        }
    }

    #[tokio::test]
    async fn workflow_roundtrip_and_upsert() {
        let repo = test_repo().await;
        let mut wf = sample_workflow();
        repo.save_workflow(&wf).await.unwrap();

        let loaded = repo.get_workflow(&wf.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "lead-scoring");
        assert_eq!(loaded.config, json!({ "layout": { "x": 10 } }));
        assert_eq!(loaded.user_id, wf.user_id);

        wf.name = "renamed".to_string();
        repo.save_workflow(&wf).await.unwrap();
        let all = repo.list_workflows().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "renamed");

        assert!(repo.get_workflow(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tasks_roundtrip_in_order() {
        let repo = test_repo().await;
        let wf = sample_workflow();
        repo.save_workflow(&wf).await.unwrap();

        let mut score = task(wf.id, "score", TaskKind::Llm, 1);
        score.depends_on = vec!["fetch".to_string()];
        score.retry = Some(RetryOverride {
            max_retries: Some(1),
            ..RetryOverride::default()
        });
        score.config = json!({ "operation": "sentiment" });
        let fetch = task(wf.id, "fetch", TaskKind::Api, 0);
        repo.save_tasks(&wf.id, &[score, fetch]).await.unwrap();

        let tasks = repo.list_tasks(&wf.id).await.unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["fetch", "score"]);
        assert_eq!(tasks[1].kind, TaskKind::Llm);
        assert_eq!(tasks[1].depends_on, vec!["fetch".to_string()]);
        assert_eq!(tasks[1].retry.as_ref().unwrap().max_retries, Some(1));
        assert_eq!(tasks[1].config, json!({ "operation": "sentiment" }));

        // Saving again replaces the whole set.
        repo.save_tasks(&wf.id, &[task(wf.id, "only", TaskKind::Condition, 0)])
            .await
            .unwrap();
        assert_eq!(repo.list_tasks(&wf.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn save_tasks_requires_workflow() {
        let repo = test_repo().await;
        let id = Uuid::now_v7();
        let err = repo
            .save_tasks(&id, &[task(id, "a", TaskKind::Condition, 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_task_ids_conflict() {
        let repo = test_repo().await;
        let wf = sample_workflow();
        repo.save_workflow(&wf).await.unwrap();
        let err = repo
            .save_tasks(
                &wf.id,
                &[
                    task(wf.id, "a", TaskKind::Condition, 0),
                    task(wf.id, "a", TaskKind::Condition, 1),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        // The transaction rolled back.
        assert!(repo.list_tasks(&wf.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn execution_lifecycle() {
        let repo = test_repo().await;
        let wf = sample_workflow();
        let mut exec = WorkflowExecution::start(wf.id, wf.user_id, Some(json!({ "text": "hi" })));
        repo.create_execution(&exec).await.unwrap();
        assert!(matches!(
            repo.create_execution(&exec).await,
            Err(RepositoryError::Conflict(_))
        ));

        let mut result = BTreeMap::new();
        result.insert("t1".to_string(), json!({ "ok": true }));
        exec.status = ExecutionStatus::Completed;
        exec.result = Some(result);
        exec.completed_at = Some(Utc::now());
        repo.update_execution(&exec).await.unwrap();

        let loaded = repo.get_execution(&exec.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ExecutionStatus::Completed);
        assert_eq!(loaded.input_data, Some(json!({ "text": "hi" })));
        assert_eq!(loaded.result.unwrap()["t1"], json!({ "ok": true }));
        assert!(loaded.completed_at.is_some());

        let unknown = WorkflowExecution::start(wf.id, wf.user_id, None);
        assert!(matches!(
            repo.update_execution(&unknown).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_executions_newest_first() {
        let repo = test_repo().await;
        let wf_id = Uuid::now_v7();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let exec = WorkflowExecution::start(wf_id, Uuid::nil(), None);
            repo.create_execution(&exec).await.unwrap();
            ids.push(exec.id);
        }
        let other = WorkflowExecution::start(Uuid::now_v7(), Uuid::nil(), None);
        repo.create_execution(&other).await.unwrap();

        let listed = repo.list_executions(&wf_id, 2).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, ids[2]);
        assert_eq!(listed[1].id, ids[1]);
    }

    #[tokio::test]
    async fn task_logs_keep_append_order() {
        let repo = test_repo().await;
        let exec = WorkflowExecution::start(Uuid::now_v7(), Uuid::nil(), None);
        repo.create_execution(&exec).await.unwrap();

        let statuses = [TaskStatus::Running, TaskStatus::Running, TaskStatus::Failed];
        for (i, status) in statuses.iter().enumerate() {
            let log = TaskLog {
                id: Uuid::now_v7(),
                execution_id: exec.id,
                task_id: "t1".to_string(),
                status: *status,
                attempt: (i as u32) + 1,
                message: Some(format!("row {i}")),
                result: None,
                error_message: (i > 0).then(|| "timed out after 2s".to_string()),
                error_kind: (i > 0).then_some(TaskErrorKind::Timeout),
                created_at: Utc::now(),
            };
            repo.append_task_log(&log).await.unwrap();
        }

        let logs = repo.list_task_logs(&exec.id).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message.as_deref(), Some("row 0"));
        assert_eq!(logs[0].error_kind, None);
        assert_eq!(logs[2].status, TaskStatus::Failed);
        assert_eq!(logs[2].attempt, 3);
        assert_eq!(logs[2].error_kind, Some(TaskErrorKind::Timeout));
    }
}
