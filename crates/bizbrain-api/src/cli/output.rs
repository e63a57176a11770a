//! Shared rendering for executions and task logs.

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde_json::{Value, json};

use bizbrain_types::workflow::{ExecutionStatus, TaskLog, TaskStatus, WorkflowExecution};

pub fn short_id(id: &uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

pub fn execution_status_cell(status: ExecutionStatus) -> Cell {
    let cell = Cell::new(status.as_str());
    match status {
        ExecutionStatus::Pending => cell.fg(Color::Yellow),
        ExecutionStatus::Running => cell.fg(Color::Blue),
        ExecutionStatus::Completed => cell.fg(Color::Green),
        ExecutionStatus::Failed => cell.fg(Color::Red),
    }
}

fn task_status_cell(status: TaskStatus, has_error: bool) -> Cell {
    let cell = Cell::new(status.as_str());
    match status {
        TaskStatus::Pending => cell.fg(Color::Yellow),
        TaskStatus::Running if has_error => cell.fg(Color::DarkYellow),
        TaskStatus::Running => cell.fg(Color::Blue),
        TaskStatus::Completed => cell.fg(Color::Green),
        TaskStatus::Failed => cell.fg(Color::Red),
    }
}

pub fn execution_json(execution: &WorkflowExecution) -> Value {
    json!({
        "id": execution.id.to_string(),
        "workflow_id": execution.workflow_id.to_string(),
        "user_id": execution.user_id.to_string(),
        "status": execution.status.as_str(),
        "input_data": execution.input_data,
        "result": execution.result,
        "error_message": execution.error_message,
        "started_at": execution.started_at.map(|t| t.to_rfc3339()),
        "completed_at": execution.completed_at.map(|t| t.to_rfc3339()),
    })
}

pub fn task_log_json(log: &TaskLog) -> Value {
    json!({
        "task_id": log.task_id,
        "status": log.status.as_str(),
        "attempt": log.attempt,
        "message": log.message,
        "result": log.result,
        "error_message": log.error_message,
        "error_kind": log.error_kind.map(|k| k.as_str()),
        "created_at": log.created_at.to_rfc3339(),
    })
}

/// Print the header block for one execution, including its per-task results.
pub fn print_execution(execution: &WorkflowExecution) {
    let status = match execution.status {
        ExecutionStatus::Completed => style(execution.status.as_str()).green().bold(),
        ExecutionStatus::Failed => style(execution.status.as_str()).red().bold(),
        _ => style(execution.status.as_str()).blue(),
    };

    println!();
    println!(
        "  {} {}",
        style("Execution").bold(),
        style(execution.id).cyan()
    );
    println!("  Workflow: {}", execution.workflow_id);
    println!("  Status: {status}");
    if let (Some(started), Some(completed)) = (execution.started_at, execution.completed_at) {
        let elapsed = completed - started;
        println!("  Duration: {}ms", elapsed.num_milliseconds());
    }
    if let Some(ref err) = execution.error_message {
        println!("  Error: {}", style(err).red());
    }

    if let Some(results) = execution.result.as_ref().filter(|r| !r.is_empty()) {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![Cell::new("Task").fg(Color::Cyan), Cell::new("Result")]);
        for (task_id, value) in results {
            table.add_row(vec![Cell::new(task_id), Cell::new(truncate(&value.to_string(), 80))]);
        }
        println!();
        println!("{table}");
    }
    println!();
}

/// Print a task log timeline as a table.
pub fn print_timeline(logs: &[TaskLog]) {
    if logs.is_empty() {
        println!("  No task logs recorded.");
        println!();
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Time").fg(Color::Cyan),
            Cell::new("Task"),
            Cell::new("Status"),
            Cell::new("Attempt"),
            Cell::new("Detail"),
        ]);

    for log in logs {
        let detail = match (&log.error_message, &log.message) {
            (Some(err), _) => {
                let kind = log.error_kind.map(|k| k.as_str()).unwrap_or("error");
                format!("[{kind}] {}", truncate(err, 60))
            }
            (None, Some(msg)) => truncate(msg, 60),
            (None, None) => "-".to_string(),
        };

        table.add_row(vec![
            Cell::new(log.created_at.format("%H:%M:%S%.3f").to_string()),
            Cell::new(&log.task_id),
            task_status_cell(log.status, log.error_message.is_some()),
            Cell::new(log.attempt),
            Cell::new(detail),
        ]);
    }

    println!("{table}");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer message", 10), "a much ...");
    }

    #[test]
    fn test_execution_json_shape() {
        let execution = WorkflowExecution::start(uuid::Uuid::now_v7(), uuid::Uuid::nil(), None);
        let value = execution_json(&execution);
        assert_eq!(value["status"], "running");
        assert_eq!(value["user_id"], uuid::Uuid::nil().to_string());
        assert!(value["completed_at"].is_null());
    }
}
