//! Language-model client implementations.
//!
//! Contains the [`OpenAiCompatClient`] implementation of the `LlmClient`
//! trait defined in `bizbrain-core`, plus a factory ([`create_client`]) that
//! builds it from [`LlmSettings`].

pub mod openai;

use bizbrain_core::llm::box_client::BoxLlmClient;
use bizbrain_types::config::LlmSettings;
use bizbrain_types::llm::LlmError;

pub use self::openai::OpenAiCompatClient;

/// Create a [`BoxLlmClient`] from settings.
///
/// The API key is read from the environment variable named by
/// `settings.api_key_env`.
pub fn create_client(settings: &LlmSettings) -> Result<BoxLlmClient, LlmError> {
    let client = OpenAiCompatClient::from_settings(settings)?;
    tracing::debug!(base_url = %client.base_url(), "llm client ready");
    Ok(BoxLlmClient::new(client))
}
