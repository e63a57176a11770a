//! LlmClient trait definition.
//!
//! The engine only needs a handful of high-level operations from a language
//! model; prompt construction and provider response parsing live behind this
//! trait.

use bizbrain_types::llm::LlmError;
use serde_json::Value;

/// Trait for language-model backends used by LLM tasks.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in bizbrain-infra (e.g., `OpenAiCompatClient`).
pub trait LlmClient: Send + Sync {
    /// Human-readable client name (e.g., "openai").
    fn name(&self) -> &str;

    /// Free-form text completion.
    fn complete(
        &self,
        prompt: &str,
        model: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send;

    /// Embedding vector of `text` using the client's embedding model.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Sentiment analysis. Returns a structured JSON verdict.
    fn sentiment(
        &self,
        text: &str,
        model: &str,
    ) -> impl std::future::Future<Output = Result<Value, LlmError>> + Send;

    /// Named-entity extraction. Returns a structured JSON list.
    fn entities(
        &self,
        text: &str,
        model: &str,
    ) -> impl std::future::Future<Output = Result<Value, LlmError>> + Send;

    /// Summarize `text` in at most roughly `max_length` words.
    fn summarize(
        &self,
        text: &str,
        model: &str,
        max_length: u32,
    ) -> impl std::future::Future<Output = Result<Value, LlmError>> + Send;
}
