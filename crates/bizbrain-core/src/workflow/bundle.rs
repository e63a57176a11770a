//! Workflow bundles: a workflow and its tasks in one YAML or JSON document.
//!
//! Bundles are the file format for importing workflows without an external
//! CRUD layer. Parsing is lenient about optional fields; validation runs the
//! full graph build plus per-task config checks, so a bundle that validates
//! here will not fail graph construction at execution time.

use std::path::Path;

use bizbrain_types::error::{RepositoryError, TaskConfigError};
use bizbrain_types::workflow::{RetryOverride, TaskConfig, TaskDefinition, TaskKind, Workflow};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::repository::workflow::WorkflowRepository;

use super::graph::{GraphError, TaskGraph};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while loading or importing a bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// YAML/JSON parse failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// Structural validation failure outside the graph.
    #[error("validation error: {0}")]
    Validation(String),

    /// The task set does not form a valid graph.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A task's config does not match its kind.
    #[error("task '{task_id}': {source}")]
    InvalidTask {
        task_id: String,
        source: TaskConfigError,
    },

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisting the imported workflow failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

// ---------------------------------------------------------------------------
// Bundle format
// ---------------------------------------------------------------------------

/// A workflow document as written by hand.
///
/// ```yaml
/// name: lead-scoring
/// tasks:
///   - id: fetch
///     type: api
///     config: { url: "https://crm.example.com/leads" }
///   - id: score
///     type: llm
///     depends_on: [fetch]
///     config: { operation: sentiment }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowBundle {
    /// Stable id; re-importing a bundle with the same id replaces the workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub tasks: Vec<BundleTask>,
}

/// One task inside a bundle. `name` defaults to the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleTask {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryOverride>,
}

impl WorkflowBundle {
    /// Split into the stored workflow and task rows.
    ///
    /// A bundle without an id gets a fresh one; a bundle without an owner is
    /// attributed to `default_user`.
    pub fn into_parts(self, default_user: Uuid) -> (Workflow, Vec<TaskDefinition>) {
        let workflow = Workflow {
            id: self.id.unwrap_or_else(Uuid::now_v7),
            name: self.name,
            description: self.description,
            config: self.config,
            user_id: self.user_id.unwrap_or(default_user),
            created_at: Utc::now(),
        };
        let tasks = self
            .tasks
            .into_iter()
            .map(|t| TaskDefinition {
                name: t.name.unwrap_or_else(|| t.id.clone()),
                id: t.id,
                workflow_id: workflow.id,
                description: t.description,
                kind: t.kind,
                config: t.config,
                order: t.order,
                depends_on: t.depends_on,
                retry: t.retry,
            })
            .collect();
        (workflow, tasks)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a bundle from YAML (JSON is accepted as a YAML subset).
pub fn parse_bundle(content: &str) -> Result<WorkflowBundle, BundleError> {
    serde_yaml_ng::from_str(content).map_err(|e| BundleError::Parse(e.to_string()))
}

/// Load a bundle from a `.yaml`, `.yml`, or `.json` file.
pub fn load_bundle_file(path: &Path) -> Result<WorkflowBundle, BundleError> {
    let content = std::fs::read_to_string(path)?;
    parse_bundle(&content)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a workflow and its tasks, returning the built graph.
///
/// Checks:
/// - Workflow name is non-empty
/// - The task set builds into a graph (unique ids, known references, no cycles)
/// - Every task config parses for its kind
pub fn validate(workflow: &Workflow, tasks: &[TaskDefinition]) -> Result<TaskGraph, BundleError> {
    if workflow.name.trim().is_empty() {
        return Err(BundleError::Validation(
            "workflow name must not be empty".to_string(),
        ));
    }

    let graph = TaskGraph::build(tasks.to_vec())?;

    for task in tasks {
        TaskConfig::from_definition(task).map_err(|source| BundleError::InvalidTask {
            task_id: task.id.clone(),
            source,
        })?;
    }
    Ok(graph)
}

/// Validate and store a workflow with its tasks.
pub async fn import<R: WorkflowRepository>(
    repo: &R,
    workflow: &Workflow,
    tasks: &[TaskDefinition],
) -> Result<TaskGraph, BundleError> {
    let graph = validate(workflow, tasks)?;
    repo.save_workflow(workflow).await?;
    repo.save_tasks(&workflow.id, tasks).await?;

    tracing::info!(
        workflow_id = %workflow.id,
        workflow = workflow.name.as_str(),
        tasks = tasks.len(),
        "workflow imported"
    );
    Ok(graph)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::InMemoryWorkflowRepository;

    const LEADS: &str = r#"
name: lead-scoring
description: Score inbound leads
tasks:
  - id: fetch
    type: api
    config:
      url: https://crm.example.com/leads
      headers:
        Authorization: Bearer token
  - id: score
    name: Score lead
    type: llm
    depends_on: [fetch]
    order: 2
    retry:
      max_retries: 1
    config:
      operation: sentiment
      input_field: results.fetch.summary
"#;

    #[test]
    fn parse_yaml_bundle() {
        let bundle = parse_bundle(LEADS).unwrap();
        assert_eq!(bundle.name, "lead-scoring");
        assert_eq!(bundle.tasks.len(), 2);

        let owner = Uuid::now_v7();
        let (workflow, tasks) = bundle.into_parts(owner);
        assert_eq!(workflow.user_id, owner);
        assert_eq!(tasks[0].name, "fetch");
        assert_eq!(tasks[1].name, "Score lead");
        assert_eq!(tasks[1].workflow_id, workflow.id);
        assert_eq!(tasks[1].retry.as_ref().and_then(|r| r.max_retries), Some(1));
        assert_eq!(tasks[1].retry.as_ref().and_then(|r| r.timeout_secs), None);
    }

    #[test]
    fn parse_json_bundle() {
        let json = r#"{"name": "j", "tasks": [{"id": "c", "type": "condition", "config": {"condition": "true"}}]}"#;
        let bundle = parse_bundle(json).unwrap();
        assert_eq!(bundle.tasks[0].kind, TaskKind::Condition);
    }

    #[test]
    fn parse_rejects_unknown_kind() {
        let err = parse_bundle("name: x\ntasks:\n  - id: a\n    type: shell\n").unwrap_err();
        assert!(matches!(err, BundleError::Parse(_)));
    }

    #[test]
    fn validate_reports_bad_task_config() {
        let yaml = "name: x\ntasks:\n  - id: a\n    type: api\n    config: {}\n";
        let (workflow, tasks) = parse_bundle(yaml).unwrap().into_parts(Uuid::nil());
        let err = validate(&workflow, &tasks).unwrap_err();
        match err {
            BundleError::InvalidTask { task_id, .. } => assert_eq!(task_id, "a"),
            other => panic!("expected InvalidTask, got {other:?}"),
        }
    }

    #[test]
    fn validate_reports_cycles() {
        let yaml = r#"
name: loop
tasks:
  - id: a
    type: condition
    depends_on: [b]
    config: { condition: "true" }
  - id: b
    type: condition
    depends_on: [a]
    config: { condition: "true" }
"#;
        let (workflow, tasks) = parse_bundle(yaml).unwrap().into_parts(Uuid::nil());
        let err = validate(&workflow, &tasks).unwrap_err();
        assert!(matches!(err, BundleError::Graph(GraphError::Cycle(_))));
    }

    #[test]
    fn validate_rejects_blank_name() {
        let (workflow, tasks) = parse_bundle("name: ' '\n").unwrap().into_parts(Uuid::nil());
        assert!(matches!(
            validate(&workflow, &tasks),
            Err(BundleError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn import_stores_workflow_and_tasks() {
        let repo = InMemoryWorkflowRepository::new();
        let (workflow, tasks) = parse_bundle(LEADS).unwrap().into_parts(Uuid::nil());
        let graph = import(&repo, &workflow, &tasks).await.unwrap();
        assert_eq!(graph.topological_order(), ["fetch", "score"]);

        let stored = repo.get_workflow(&workflow.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "lead-scoring");
        assert_eq!(repo.list_tasks(&workflow.id).await.unwrap().len(), 2);
    }

    #[test]
    fn load_bundle_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.yaml");
        std::fs::write(&path, LEADS).unwrap();
        let bundle = load_bundle_file(&path).unwrap();
        assert_eq!(bundle.description.as_deref(), Some("Score inbound leads"));

        let missing = load_bundle_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(missing, BundleError::Io(_)));
    }
}
