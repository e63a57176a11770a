//! Process-local `WorkflowRepository` backed by concurrent maps.
//!
//! Nothing survives the process. Used for `bizbrain run <file>` dry runs and
//! as the storage backend of the engine tests.

use std::sync::Arc;

use bizbrain_types::error::RepositoryError;
use bizbrain_types::workflow::{TaskDefinition, TaskLog, Workflow, WorkflowExecution};
use dashmap::DashMap;
use uuid::Uuid;

use super::workflow::WorkflowRepository;

/// In-memory workflow storage. Cloning shares the underlying maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkflowRepository {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    workflows: DashMap<Uuid, Workflow>,
    tasks: DashMap<Uuid, Vec<TaskDefinition>>,
    executions: DashMap<Uuid, WorkflowExecution>,
    task_logs: DashMap<Uuid, Vec<TaskLog>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn get_workflow(&self, id: &Uuid) -> Result<Option<Workflow>, RepositoryError> {
        Ok(self.inner.workflows.get(id).map(|w| w.clone()))
    }

    async fn list_tasks(&self, workflow_id: &Uuid) -> Result<Vec<TaskDefinition>, RepositoryError> {
        let mut tasks = self
            .inner
            .tasks
            .get(workflow_id)
            .map(|t| t.clone())
            .unwrap_or_default();
        tasks.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn save_workflow(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        self.inner.workflows.insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn save_tasks(
        &self,
        workflow_id: &Uuid,
        tasks: &[TaskDefinition],
    ) -> Result<(), RepositoryError> {
        if !self.inner.workflows.contains_key(workflow_id) {
            return Err(RepositoryError::NotFound);
        }
        self.inner.tasks.insert(*workflow_id, tasks.to_vec());
        Ok(())
    }

    async fn create_execution(&self, execution: &WorkflowExecution) -> Result<(), RepositoryError> {
        if self.inner.executions.contains_key(&execution.id) {
            return Err(RepositoryError::Conflict(format!(
                "execution {} already exists",
                execution.id
            )));
        }
        self.inner.executions.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn update_execution(&self, execution: &WorkflowExecution) -> Result<(), RepositoryError> {
        match self.inner.executions.get_mut(&execution.id) {
            Some(mut existing) => {
                *existing = execution.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn get_execution(&self, id: &Uuid) -> Result<Option<WorkflowExecution>, RepositoryError> {
        Ok(self.inner.executions.get(id).map(|e| e.clone()))
    }

    async fn list_executions(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<WorkflowExecution>, RepositoryError> {
        let mut executions: Vec<WorkflowExecution> = self
            .inner
            .executions
            .iter()
            .filter(|e| e.workflow_id == *workflow_id)
            .map(|e| e.clone())
            .collect();
        // UUIDv7 ids sort by creation time.
        executions.sort_by(|a, b| b.id.cmp(&a.id));
        executions.truncate(limit as usize);
        Ok(executions)
    }

    async fn append_task_log(&self, log: &TaskLog) -> Result<(), RepositoryError> {
        self.inner
            .task_logs
            .entry(log.execution_id)
            .or_default()
            .push(log.clone());
        Ok(())
    }

    async fn list_task_logs(&self, execution_id: &Uuid) -> Result<Vec<TaskLog>, RepositoryError> {
        Ok(self
            .inner
            .task_logs
            .get(execution_id)
            .map(|logs| logs.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizbrain_types::workflow::{ExecutionStatus, TaskKind, TaskStatus};
    use chrono::Utc;
    use serde_json::json;

    fn workflow() -> Workflow {
        Workflow {
            id: Uuid::now_v7(),
            name: "wf".to_string(),
            description: None,
            config: json!({}),
            user_id: Uuid::nil(),
            created_at: Utc::now(),
        }
    }

    fn task(workflow_id: Uuid, id: &str, order: i32) -> TaskDefinition {
        TaskDefinition {
            id: id.to_string(),
            workflow_id,
            name: id.to_string(),
            description: None,
            kind: TaskKind::Condition,
            config: json!({ "condition": "true" }),
            order,
            depends_on: vec![],
            retry: None,
        }
    }

    #[tokio::test]
    async fn tasks_are_listed_by_order_then_id() {
        let repo = InMemoryWorkflowRepository::new();
        let wf = workflow();
        repo.save_workflow(&wf).await.unwrap();
        repo.save_tasks(
            &wf.id,
            &[task(wf.id, "c", 0), task(wf.id, "a", 1), task(wf.id, "b", 0)],
        )
        .await
        .unwrap();

        let ids: Vec<String> = repo
            .list_tasks(&wf.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn save_tasks_requires_workflow() {
        let repo = InMemoryWorkflowRepository::new();
        let missing = Uuid::now_v7();
        let err = repo.save_tasks(&missing, &[]).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn execution_lifecycle() {
        let repo = InMemoryWorkflowRepository::new();
        let wf = workflow();
        let mut exec = WorkflowExecution::start(wf.id, Uuid::nil(), None);
        repo.create_execution(&exec).await.unwrap();
        assert!(repo.create_execution(&exec).await.is_err());

        exec.status = ExecutionStatus::Completed;
        repo.update_execution(&exec).await.unwrap();

        let loaded = repo.get_execution(&exec.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ExecutionStatus::Completed);

        let listed = repo.list_executions(&wf.id, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn task_logs_keep_insertion_order() {
        let repo = InMemoryWorkflowRepository::new();
        let execution_id = Uuid::now_v7();
        for (attempt, status) in [(1, TaskStatus::Running), (1, TaskStatus::Completed)] {
            repo.append_task_log(&TaskLog {
                id: Uuid::now_v7(),
                execution_id,
                task_id: "t1".to_string(),
                status,
                attempt,
                message: None,
                result: None,
                error_message: None,
                error_kind: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }
        let logs = repo.list_task_logs(&execution_id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].status, TaskStatus::Running);
        assert_eq!(logs[1].status, TaskStatus::Completed);
    }
}
