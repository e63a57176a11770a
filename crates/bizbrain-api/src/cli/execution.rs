//! Execution history subcommands: `executions` and `logs`.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use bizbrain_core::repository::workflow::WorkflowRepository;

use super::output::{
    execution_json, execution_status_cell, print_execution, print_timeline, short_id,
    task_log_json, truncate,
};
use crate::state::AppState;

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse::<Uuid>()
        .with_context(|| format!("Invalid {what}: '{raw}'"))
}

pub async fn handle_executions(state: &AppState, workflow_id: &str, limit: u32, json: bool) -> Result<()> {
    let workflow_id = parse_id(workflow_id, "workflow ID")?;
    let repo = state.workflow_repo();

    let workflow = repo
        .get_workflow(&workflow_id)
        .await
        .context("Failed to look up workflow")?
        .ok_or_else(|| anyhow::anyhow!("Workflow '{workflow_id}' not found"))?;

    let executions = repo
        .list_executions(&workflow_id, limit)
        .await
        .context("Failed to list executions")?;

    if json {
        let out: Vec<_> = executions.iter().map(execution_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if executions.is_empty() {
        println!();
        println!("  No executions for workflow '{}'.", workflow.name);
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Execution").fg(Color::Cyan),
            Cell::new("Status"),
            Cell::new("Started"),
            Cell::new("Completed"),
            Cell::new("Error"),
        ]);

    for e in &executions {
        let fmt = |t: Option<chrono::DateTime<chrono::Utc>>| {
            t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        table.add_row(vec![
            Cell::new(short_id(&e.id)),
            execution_status_cell(e.status),
            Cell::new(fmt(e.started_at)),
            Cell::new(fmt(e.completed_at)),
            Cell::new(
                e.error_message
                    .as_deref()
                    .map(|m| truncate(m, 40))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    println!();
    println!("  Executions of '{}'", style(&workflow.name).cyan());
    println!();
    println!("{table}");
    println!();

    Ok(())
}

pub async fn handle_logs(state: &AppState, execution_id: &str, json: bool) -> Result<()> {
    let execution_id = parse_id(execution_id, "execution ID")?;
    let repo = state.workflow_repo();

    let execution = repo
        .get_execution(&execution_id)
        .await
        .context("Failed to look up execution")?
        .ok_or_else(|| anyhow::anyhow!("Execution '{execution_id}' not found"))?;

    let logs = repo
        .list_task_logs(&execution_id)
        .await
        .context("Failed to list task logs")?;

    if json {
        let out = serde_json::json!({
            "execution": execution_json(&execution),
            "timeline": logs.iter().map(task_log_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_execution(&execution);
    print_timeline(&logs);
    Ok(())
}
