//! Workflow bundle subcommands: import, validate, and list.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use bizbrain_core::workflow::bundle::{self, BundleError};
use bizbrain_core::workflow::graph::TaskGraph;
use bizbrain_types::workflow::{TaskDefinition, Workflow};

use crate::state::AppState;

/// Read a bundle file and split it into a workflow and its task rows.
pub fn load_parts(file: &Path, default_user: Uuid) -> Result<(Workflow, Vec<TaskDefinition>)> {
    let parsed = bundle::load_bundle_file(file).map_err(|e| match e {
        BundleError::Parse(msg) => anyhow::anyhow!("Failed to parse workflow bundle: {msg}"),
        other => anyhow::anyhow!("Failed to load {}: {other}", file.display()),
    })?;
    Ok(parsed.into_parts(default_user))
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

pub async fn handle_import(state: &AppState, file: &Path, user: Option<Uuid>, json: bool) -> Result<()> {
    let (workflow, tasks) = load_parts(file, user.unwrap_or_else(Uuid::nil))?;
    let repo = state.workflow_repo();

    let graph = bundle::import(&repo, &workflow, &tasks)
        .await
        .with_context(|| format!("Failed to import workflow '{}'", workflow.name))?;

    if json {
        let out = serde_json::json!({
            "id": workflow.id.to_string(),
            "name": workflow.name,
            "user_id": workflow.user_id.to_string(),
            "tasks": tasks.len(),
            "order": graph.topological_order(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} Imported workflow '{}'",
            style("*").green().bold(),
            style(&workflow.name).cyan()
        );
        println!("  ID: {}", workflow.id);
        print_graph_summary(&graph, tasks.len());
        println!();
        println!(
            "  Run it with: {}",
            style(format!("bizbrain run {}", workflow.id)).dim()
        );
        println!();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

pub fn handle_validate(file: &Path, json: bool) -> Result<()> {
    let (workflow, tasks) = load_parts(file, Uuid::nil())?;

    match bundle::validate(&workflow, &tasks) {
        Ok(graph) => {
            if json {
                let out = serde_json::json!({
                    "valid": true,
                    "name": workflow.name,
                    "tasks": tasks.len(),
                    "order": graph.topological_order(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!();
                println!(
                    "  {} Workflow '{}' is valid",
                    style("*").green().bold(),
                    style(&workflow.name).cyan()
                );
                print_graph_summary(&graph, tasks.len());
                println!();
            }
            Ok(())
        }
        Err(err) => {
            if json {
                let out = serde_json::json!({
                    "valid": false,
                    "name": workflow.name,
                    "error": err.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            Err(anyhow::Error::new(err).context(format!("Workflow '{}' is invalid", workflow.name)))
        }
    }
}

fn print_graph_summary(graph: &TaskGraph, total_tasks: usize) {
    let sub_tasks = total_tasks.saturating_sub(graph.len());
    println!("  Tasks: {total_tasks} ({sub_tasks} run inside loop/parallel tasks)");
    println!("  Order: {}", graph.topological_order().join(" -> "));
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

pub async fn handle_list(state: &AppState, json: bool) -> Result<()> {
    let workflows = state
        .workflow_repo()
        .list_workflows()
        .await
        .context("Failed to list workflows")?;

    if json {
        let out: Vec<_> = workflows
            .iter()
            .map(|w| {
                serde_json::json!({
                    "id": w.id.to_string(),
                    "name": w.name,
                    "description": w.description,
                    "user_id": w.user_id.to_string(),
                    "created_at": w.created_at.to_rfc3339(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if workflows.is_empty() {
        println!();
        println!("  No workflows imported.");
        println!(
            "  Import one with: {}",
            style("bizbrain import <bundle.yaml>").dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("ID"),
            Cell::new("Description"),
            Cell::new("Created"),
        ]);

    for w in &workflows {
        table.add_row(vec![
            Cell::new(&w.name),
            Cell::new(w.id),
            Cell::new(w.description.as_deref().unwrap_or("-")),
            Cell::new(w.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}
