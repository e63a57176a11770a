//! BizBrain workflow CLI entry point.
//!
//! Binary name: `bizbrain`
//!
//! Parses CLI arguments, initializes tracing, opens the data directory, and
//! dispatches to the command handlers.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use bizbrain_observe::tracing_setup::{init_tracing, shutdown_tracing};

use cli::{Cli, Commands, parse_uuid_arg};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "bizbrain", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(cli.verbose, cli.json, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = dispatch(cli).await;
    shutdown_tracing();
    result
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Import { file, user } => {
            let user = parse_uuid_arg(user.as_deref(), "user")?;
            let state = AppState::init().await?;
            cli::workflow::handle_import(&state, &file, user, cli.json).await
        }

        Commands::Validate { file } => cli::workflow::handle_validate(&file, cli.json),

        Commands::Run {
            target,
            input,
            user,
        } => {
            let user = parse_uuid_arg(user.as_deref(), "user")?;
            cli::run::handle_run(&target, input.as_deref(), user, cli.json).await
        }

        Commands::Workflows => {
            let state = AppState::init().await?;
            cli::workflow::handle_list(&state, cli.json).await
        }

        Commands::Executions { workflow_id, limit } => {
            let state = AppState::init().await?;
            cli::execution::handle_executions(&state, &workflow_id, limit, cli.json).await
        }

        Commands::Logs { execution_id } => {
            let state = AppState::init().await?;
            cli::execution::handle_logs(&state, &execution_id, cli.json).await
        }

        Commands::Completions { .. } => Ok(()),
    }
}
