//! Infrastructure layer for BizBrain.
//!
//! Contains implementations of the traits defined in `bizbrain-core`:
//! SQLite workflow storage, the OpenAI-compatible LLM client, the reqwest
//! HTTP client for API tasks, and the `config.toml` loader.

pub mod config;
pub mod http;
pub mod llm;
pub mod sqlite;
