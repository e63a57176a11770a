//! Application state wiring storage, configuration, and collaborators.
//!
//! AppState pins the engine's generic repository to the SQLite
//! implementation. Dry runs build their own engine over the in-memory
//! repository but share the same collaborators.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use bizbrain_core::http::BoxHttpClient;
use bizbrain_core::llm::box_client::BoxLlmClient;
use bizbrain_core::repository::workflow::WorkflowRepository;
use bizbrain_core::workflow::engine::WorkflowEngine;
use bizbrain_infra::config::{load_engine_config, resolve_data_dir};
use bizbrain_infra::http::ReqwestHttpClient;
use bizbrain_infra::llm::create_client;
use bizbrain_infra::sqlite::pool::DatabasePool;
use bizbrain_infra::sqlite::workflow::SqliteWorkflowRepository;
use bizbrain_types::config::EngineConfig;

/// Shared application state for CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: EngineConfig,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Resolve the data directory, load `config.toml`, and open the database.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_engine_config(&data_dir).await;

        let db_pool = DatabasePool::open_in(&data_dir)
            .await
            .with_context(|| format!("Failed to open database in {}", data_dir.display()))?;

        Ok(Self {
            data_dir,
            config,
            db_pool,
        })
    }

    pub fn workflow_repo(&self) -> SqliteWorkflowRepository {
        SqliteWorkflowRepository::new(self.db_pool.clone())
    }

    /// Engine over the persistent SQLite repository.
    pub fn engine(&self) -> anyhow::Result<WorkflowEngine<SqliteWorkflowRepository>> {
        build_engine(self.workflow_repo(), &self.config)
    }
}

/// Build an engine over `repo` with the configured LLM and HTTP clients.
pub fn build_engine<R: WorkflowRepository + 'static>(
    repo: R,
    config: &EngineConfig,
) -> anyhow::Result<WorkflowEngine<R>> {
    let llm: BoxLlmClient = create_client(&config.llm).context("Failed to create LLM client")?;
    let http = ReqwestHttpClient::new(&config.http).context("Failed to create HTTP client")?;

    Ok(WorkflowEngine::new(
        repo,
        Arc::new(llm),
        Arc::new(BoxHttpClient::new(http)),
        config,
    ))
}
