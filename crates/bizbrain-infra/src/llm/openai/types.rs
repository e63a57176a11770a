//! OpenAI wire types and analysis prompts.
//!
//! Request/response structures for `/chat/completions` and `/embeddings`.
//! These are provider-specific; the engine only ever sees the
//! `serde_json::Value` verdicts produced from them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use bizbrain_types::llm::LlmError;

/// Request body for `/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Single-turn user prompt.
    pub fn user(prompt: &str, model: &str, temperature: f64, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature,
            max_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Non-streaming response from `/chat/completions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice.
    pub fn into_text(self) -> Result<String, LlmError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("completion has no choices".to_string()))
    }
}

/// Request body for `/embeddings`.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,
}

impl EmbeddingResponse {
    pub fn into_vector(self) -> Result<Vec<f32>, LlmError> {
        self.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::InvalidResponse("embedding response has no data".to_string()))
    }
}

/// Temperature used for the structured analysis prompts.
pub const ANALYSIS_TEMPERATURE: f64 = 0.3;

/// Token budget for sentiment and entity prompts.
pub const ANALYSIS_MAX_TOKENS: u32 = 500;

pub fn sentiment_prompt(text: &str) -> String {
    format!(
        "Analyze the sentiment of the following text. Respond with JSON only, using the keys \
         \"sentiment\" (positive, negative, or neutral), \"confidence\" (0.0 to 1.0), \
         \"key_phrases\" (array of strings), and \"summary\" (one sentence).\n\nText: {text}"
    )
}

pub fn entities_prompt(text: &str) -> String {
    format!(
        "Extract the named entities from the following text. Respond with JSON only, in the form \
         {{\"entities\": [{{\"text\": \"...\", \"type\": \"PERSON|ORGANIZATION|LOCATION|DATE|OTHER\", \
         \"start\": 0, \"end\": 0}}]}}.\n\nText: {text}"
    )
}

pub fn summary_prompt(text: &str, max_length: u32) -> String {
    format!(
        "Summarize the following text in at most {max_length} words. Respond with JSON only, using \
         the keys \"summary\" (string), \"key_points\" (array of strings), and \"length\" \
         (word count of the summary).\n\nText: {text}"
    )
}

/// Parse a model reply that should contain a JSON object.
///
/// Models often wrap JSON in a markdown fence; the fence is stripped first.
pub fn parse_json_reply(content: &str) -> Result<Value, LlmError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced)
        .map_err(|e| LlmError::InvalidResponse(format!("model reply is not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_serialization() {
        let req = ChatRequest::user("Hello", "gpt-3.5-turbo", 0.7, 256);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "Hello"}],
                "temperature": 0.7,
                "max_tokens": 256
            })
        );
    }

    #[test]
    fn test_chat_response_first_choice() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}},
                {"index": 1, "message": {"role": "assistant", "content": "second"}}
            ]
        }))
        .unwrap();
        assert_eq!(resp.into_text().unwrap(), "first");
    }

    #[test]
    fn test_chat_response_without_choices() {
        let resp: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(resp.into_text(), Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_embedding_response() {
        let resp: EmbeddingResponse = serde_json::from_value(json!({
            "data": [{"index": 0, "embedding": [0.5, -0.25]}],
            "model": "text-embedding-ada-002"
        }))
        .unwrap();
        assert_eq!(resp.into_vector().unwrap(), vec![0.5, -0.25]);
    }

    #[test]
    fn test_parse_json_reply_plain_and_fenced() {
        let plain = parse_json_reply(r#"{"sentiment": "positive", "confidence": 0.9}"#).unwrap();
        assert_eq!(plain["sentiment"], "positive");

        let fenced = parse_json_reply("```json\n{\"summary\": \"short\"}\n```").unwrap();
        assert_eq!(fenced["summary"], "short");
    }

    #[test]
    fn test_parse_json_reply_rejects_prose() {
        let err = parse_json_reply("The sentiment is positive.").unwrap_err();
        assert!(err.to_string().starts_with("invalid response: model reply is not JSON"));
    }

    #[test]
    fn test_summary_prompt_mentions_limit() {
        let prompt = summary_prompt("long text", 42);
        assert!(prompt.contains("at most 42 words"));
        assert!(prompt.ends_with("Text: long text"));
    }
}
