//! OpenAiCompatClient -- [`LlmClient`] over any OpenAI-compatible HTTP API.
//!
//! Talks to `/chat/completions` and `/embeddings` under a configurable base
//! URL, so OpenAI, local gateways, and proxies all work the same way.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when building the `Authorization` header.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use bizbrain_core::llm::client::LlmClient;
use bizbrain_types::config::LlmSettings;
use bizbrain_types::llm::LlmError;

use super::types::{
    ANALYSIS_MAX_TOKENS, ANALYSIS_TEMPERATURE, ChatRequest, ChatResponse, EmbeddingRequest,
    EmbeddingResponse, entities_prompt, parse_json_reply, sentiment_prompt, summary_prompt,
};

/// Language-model client for OpenAI-compatible endpoints.
///
/// A missing API key is not an error at construction time: workflows without
/// LLM tasks never need one. Calls fail with `AuthenticationFailed` instead.
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    embedding_model: String,
}

// No Debug derive: keeps the key out of any formatted output.

impl OpenAiCompatClient {
    pub fn new(
        api_key: Option<SecretString>,
        base_url: impl Into<String>,
        embedding_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            embedding_model: embedding_model.into(),
        })
    }

    /// Build a client from settings, reading the key from `settings.api_key_env`.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);

        if api_key.is_none() {
            tracing::debug!(
                env = %settings.api_key_env,
                "no LLM API key configured; LLM tasks will fail"
            );
        }

        Self::new(
            api_key,
            settings.base_url.clone(),
            settings.embedding_model.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, LlmError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            LlmError::AuthenticationFailed("no API key configured".to_string())
        })?;

        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), retry_after_ms, error_body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {e}")))
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        let response: ChatResponse = self.post("/chat/completions", &request).await?;
        response.into_text()
    }

    async fn analyze(&self, prompt: String, model: &str, max_tokens: u32) -> Result<Value, LlmError> {
        let content = self
            .chat(ChatRequest::user(&prompt, model, ANALYSIS_TEMPERATURE, max_tokens))
            .await?;
        parse_json_reply(&content)
    }
}

/// Map a non-2xx status to an [`LlmError`].
fn status_error(status: u16, retry_after_ms: Option<u64>, body: String) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed(body),
        429 => LlmError::RateLimited { retry_after_ms },
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

impl LlmClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.chat(ChatRequest::user(prompt, model, temperature, max_tokens))
            .await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };
        let response: EmbeddingResponse = self.post("/embeddings", &request).await?;
        response.into_vector()
    }

    async fn sentiment(&self, text: &str, model: &str) -> Result<Value, LlmError> {
        self.analyze(sentiment_prompt(text), model, ANALYSIS_MAX_TOKENS)
            .await
    }

    async fn entities(&self, text: &str, model: &str) -> Result<Value, LlmError> {
        self.analyze(entities_prompt(text), model, ANALYSIS_MAX_TOKENS)
            .await
    }

    async fn summarize(&self, text: &str, model: &str, max_length: u32) -> Result<Value, LlmError> {
        self.analyze(summary_prompt(text, max_length), model, max_length.saturating_mul(2))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_client(api_key: Option<&str>) -> OpenAiCompatClient {
        OpenAiCompatClient::new(
            api_key.map(|k| SecretString::from(k.to_string())),
            "http://localhost:9999/v1/",
            "text-embedding-ada-002",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = make_client(Some("test-key"));
        assert_eq!(client.base_url(), "http://localhost:9999/v1");
        assert_eq!(client.url("/embeddings"), "http://localhost:9999/v1/embeddings");
    }

    #[test]
    fn test_name() {
        assert_eq!(make_client(None).name(), "openai");
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(401, None, "bad key".into()),
            LlmError::AuthenticationFailed(msg) if msg == "bad key"
        ));
        assert!(matches!(
            status_error(429, Some(2000), String::new()),
            LlmError::RateLimited { retry_after_ms: Some(2000) }
        ));
        assert_eq!(
            status_error(500, None, "boom".into()).to_string(),
            "provider error: HTTP 500: boom"
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let client = make_client(None);
        let err = client.complete("hi", "gpt-3.5-turbo", 0.7, 16).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed(_)));
    }

    #[test]
    fn test_from_settings_reads_named_env_var() {
        let settings = LlmSettings {
            api_key_env: "BIZBRAIN_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmSettings::default()
        };
        let client = OpenAiCompatClient::from_settings(&settings).unwrap();
        assert!(client.api_key.is_none());
        assert_eq!(client.base_url(), "https://api.openai.com/v1");
    }
}
