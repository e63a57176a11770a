//! `bizbrain run`: execute a stored workflow or dry-run a bundle file.
//!
//! A stored workflow (UUID target) runs against SQLite and its execution is
//! kept. A bundle file runs against the in-memory repository, so nothing is
//! persisted. Ctrl+C cancels the execution and waits for it to finalize.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use console::style;
use serde_json::Value;
use uuid::Uuid;

use bizbrain_core::repository::memory::InMemoryWorkflowRepository;
use bizbrain_core::repository::workflow::WorkflowRepository;
use bizbrain_core::workflow::bundle;
use bizbrain_core::workflow::engine::WorkflowEngine;
use bizbrain_types::config::EngineConfig;
use bizbrain_types::workflow::{ExecutionStatus, TaskLog, WorkflowExecution};

use super::output::{execution_json, print_execution, print_timeline, task_log_json};
use super::workflow::load_parts;
use crate::state::{AppState, build_engine};

/// Where the workflow to run comes from.
#[derive(Debug, PartialEq)]
pub enum RunTarget<'a> {
    Stored(Uuid),
    Bundle(&'a Path),
}

impl<'a> RunTarget<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.parse::<Uuid>() {
            Ok(id) => RunTarget::Stored(id),
            Err(_) => RunTarget::Bundle(Path::new(raw)),
        }
    }
}

/// Parse `--input` as a JSON document.
pub fn parse_input(raw: Option<&str>) -> Result<Option<Value>> {
    raw.map(|s| serde_json::from_str::<Value>(s).context("--input is not valid JSON"))
        .transpose()
}

pub async fn handle_run(
    target: &str,
    input: Option<&str>,
    user: Option<Uuid>,
    json: bool,
) -> Result<()> {
    let input_data = parse_input(input)?;

    let (execution, timeline) = match RunTarget::parse(target) {
        RunTarget::Stored(workflow_id) => {
            let state = AppState::init().await?;
            let engine = Arc::new(state.engine()?);
            execute(engine, workflow_id, user.unwrap_or_else(Uuid::nil), input_data).await?
        }
        RunTarget::Bundle(path) => dry_run(path, input_data, user).await?,
    };

    if json {
        let out = serde_json::json!({
            "execution": execution_json(&execution),
            "timeline": timeline.iter().map(task_log_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_execution(&execution);
        print_timeline(&timeline);
    }

    if execution.status == ExecutionStatus::Failed {
        bail!(
            "Execution {} failed: {}",
            execution.id,
            execution.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Run a bundle file without touching the database.
async fn dry_run(
    path: &Path,
    input_data: Option<Value>,
    user: Option<Uuid>,
) -> Result<(WorkflowExecution, Vec<TaskLog>)> {
    if !path.exists() {
        bail!(
            "'{}' is neither a workflow UUID nor an existing bundle file",
            path.display()
        );
    }

    let user_id = user.unwrap_or_else(Uuid::nil);
    let (workflow, tasks) = load_parts(path, user_id)?;

    let repo = InMemoryWorkflowRepository::new();
    bundle::import(&repo, &workflow, &tasks)
        .await
        .with_context(|| format!("Workflow '{}' is invalid", workflow.name))?;

    let config = dry_run_config().await;
    let engine = Arc::new(build_engine(repo, &config)?);
    tracing::info!(workflow = workflow.name.as_str(), "dry run (nothing is persisted)");
    execute(engine, workflow.id, user_id, input_data).await
}

/// Dry runs honor `config.toml` too, without requiring the database.
async fn dry_run_config() -> EngineConfig {
    let data_dir = bizbrain_infra::config::resolve_data_dir();
    bizbrain_infra::config::load_engine_config(&data_dir).await
}

/// Begin an execution, walk it on a background task, and cancel on Ctrl+C.
async fn execute<R: WorkflowRepository + 'static>(
    engine: Arc<WorkflowEngine<R>>,
    workflow_id: Uuid,
    user_id: Uuid,
    input_data: Option<Value>,
) -> Result<(WorkflowExecution, Vec<TaskLog>)> {
    let execution = engine.begin(workflow_id, user_id, input_data).await;
    let execution_id = execution.id;

    let runner = Arc::clone(&engine);
    let mut handle = tokio::spawn(async move { runner.run(execution).await });

    let finished = tokio::select! {
        joined = &mut handle => joined.context("workflow execution task panicked")?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!(
                "  {} Cancelling execution {}...",
                style("!").yellow().bold(),
                execution_id
            );
            if let Err(e) = engine.cancel(execution_id) {
                tracing::warn!(execution_id = %execution_id, error = %e, "cancel failed");
            }
            handle.await.context("workflow execution task panicked")?
        }
    };

    let timeline = engine
        .recorder()
        .timeline(finished.id)
        .await
        .context("Failed to read task logs")?;
    Ok((finished, timeline))
}
