//! OpenAI-compatible language-model client.

pub mod client;
pub mod types;

pub use client::OpenAiCompatClient;
