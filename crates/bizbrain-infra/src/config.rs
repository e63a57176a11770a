//! Engine configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.bizbrain/` by default)
//! and deserializes it into [`EngineConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use bizbrain_types::config::EngineConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "BIZBRAIN_DATA_DIR";

/// Resolve the data directory: `BIZBRAIN_DATA_DIR`, else `~/.bizbrain`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bizbrain")
}

/// Load engine configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`EngineConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - A zero `max_concurrency` is treated as unbounded.
pub async fn load_engine_config(data_dir: &Path) -> EngineConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(mut config) => {
            if config.max_concurrency == Some(0) {
                tracing::warn!("max_concurrency = 0 in {}, treating as unbounded", config_path.display());
                config.max_concurrency = None;
            }
            config
        }
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizbrain_types::config::FailurePolicy;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.max_concurrency, None);
    }

    #[tokio::test]
    async fn valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
max_concurrency = 4
failure_policy = "halt_dispatch"

[retry]
max_retries = 1
timeout_secs = 30

[llm]
base_url = "http://localhost:11434/v1"
"#,
        )
        .await
        .unwrap();

        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config.max_concurrency, Some(4));
        assert_eq!(config.failure_policy, FailurePolicy::HaltDispatch);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.retry_delay_secs, 5);
        assert_eq!(config.retry.timeout_secs, 30);
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
        assert_eq!(config.llm.default_model, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config.retry.timeout_secs, 300);
    }

    #[tokio::test]
    async fn zero_concurrency_is_unbounded() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "max_concurrency = 0\n")
            .await
            .unwrap();

        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config.max_concurrency, None);
    }
}
