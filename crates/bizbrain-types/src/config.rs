//! Engine configuration types for BizBrain.
//!
//! `EngineConfig` represents the top-level `config.toml` that controls the
//! default retry/timeout policy, dispatch concurrency, the failure policy, and
//! the outbound language-model and HTTP clients.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the workflow engine.
///
/// Loaded from `~/.bizbrain/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub retry: RetrySettings,

    /// Upper bound on concurrently running top-level tasks. Unset = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub http: HttpSettings,
}

/// Engine-wide retry/timeout policy applied to every task attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff delay; doubled after every failed attempt.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Wall-clock budget for a single attempt.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// What the engine does with *independent* ready tasks once a task has failed
/// terminally. Dependents of the failed task are always blocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep dispatching tasks that do not depend on the failure.
    #[default]
    ContinueIndependent,
    /// Stop dispatching new tasks; in-flight tasks still finish.
    HaltDispatch,
}

/// Settings for the OpenAI-compatible language-model client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            embedding_model: default_embedding_model(),
            request_timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Settings for the outbound HTTP client used by API tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_http_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "bizbrain-workflow/0.1".to_string()
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_http_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retry_delay_secs, 5);
        assert_eq!(config.retry.timeout_secs, 300);
        assert!(config.max_concurrency.is_none());
        assert_eq!(config.failure_policy, FailurePolicy::ContinueIndependent);
        assert_eq!(config.llm.default_model, "gpt-3.5-turbo");
        assert_eq!(config.http.request_timeout_secs, 30);
    }

    #[test]
    fn test_engine_config_deserialize_with_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.retry, RetrySettings::default());
        assert_eq!(config.llm, LlmSettings::default());
        assert_eq!(config.http, HttpSettings::default());
    }

    #[test]
    fn test_engine_config_deserialize_with_values() {
        let toml_str = r#"
max_concurrency = 4
failure_policy = "halt_dispatch"

[retry]
max_retries = 1
timeout_secs = 10

[llm]
base_url = "http://localhost:11434/v1"
default_model = "llama3"

[http]
user_agent = "test-agent"
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.max_concurrency, Some(4));
        assert_eq!(config.failure_policy, FailurePolicy::HaltDispatch);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.retry_delay_secs, 5);
        assert_eq!(config.retry.timeout_secs, 10);
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
        assert_eq!(config.llm.default_model, "llama3");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.http.user_agent, "test-agent");
        assert_eq!(config.http.request_timeout_secs, 30);
    }

    #[test]
    fn test_failure_policy_rejects_unknown() {
        let result: Result<EngineConfig, _> = toml::from_str(r#"failure_policy = "panic""#);
        assert!(result.is_err());
    }
}
