//! CLI command definitions for the `bizbrain` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod execution;
pub mod output;
pub mod run;
pub mod workflow;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run and inspect BizBrain workflows.
#[derive(Parser)]
#[command(name = "bizbrain", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed logs (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "BIZBRAIN_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and store a workflow bundle (YAML or JSON).
    Import {
        /// Path to the bundle file.
        file: PathBuf,

        /// Owner for bundles that do not name a user_id.
        #[arg(long)]
        user: Option<String>,
    },

    /// Check a workflow bundle without storing it.
    Validate {
        /// Path to the bundle file.
        file: PathBuf,
    },

    /// Execute a stored workflow (by id) or a bundle file (dry run, nothing persisted).
    Run {
        /// Workflow UUID or path to a bundle file.
        target: String,

        /// Input data as a JSON document.
        #[arg(long)]
        input: Option<String>,

        /// User starting the execution.
        #[arg(long)]
        user: Option<String>,
    },

    /// List stored workflows.
    #[command(alias = "ls")]
    Workflows,

    /// List recent executions of a workflow, newest first.
    Executions {
        /// Workflow UUID.
        workflow_id: String,

        /// Maximum number of executions to display.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Show an execution and its task log timeline.
    Logs {
        /// Execution UUID.
        execution_id: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Parse an optional UUID argument, naming the flag in the error.
pub fn parse_uuid_arg(raw: Option<&str>, what: &str) -> anyhow::Result<Option<uuid::Uuid>> {
    raw.map(|s| {
        s.parse::<uuid::Uuid>()
            .map_err(|_| anyhow::anyhow!("Invalid {what}: '{s}' is not a UUID"))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_global_flags() {
        let cli = Cli::try_parse_from([
            "bizbrain",
            "run",
            "flows/leads.yaml",
            "--input",
            r#"{"email":"a@b.c"}"#,
            "--json",
            "-vv",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run { target, input, user } => {
                assert_eq!(target, "flows/leads.yaml");
                assert_eq!(input.as_deref(), Some(r#"{"email":"a@b.c"}"#));
                assert!(user.is_none());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_uuid_arg() {
        assert_eq!(parse_uuid_arg(None, "user").unwrap(), None);
        let id = uuid::Uuid::now_v7();
        assert_eq!(parse_uuid_arg(Some(&id.to_string()), "user").unwrap(), Some(id));
        let err = parse_uuid_arg(Some("bob"), "user").unwrap_err();
        assert_eq!(err.to_string(), "Invalid user: 'bob' is not a UUID");
    }
}
