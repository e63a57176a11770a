//! Workflow engine and trait definitions (ports) for BizBrain.
//!
//! This crate defines the repository, language-model, and HTTP traits that the
//! infrastructure layer implements, and the engine that drives a workflow run
//! through them. It depends only on `bizbrain-types` -- never on
//! `bizbrain-infra` or any database/network crate.

pub mod http;
pub mod llm;
pub mod repository;
pub mod workflow;
