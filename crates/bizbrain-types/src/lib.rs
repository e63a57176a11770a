//! Shared domain types for BizBrain.
//!
//! This crate contains the types exchanged between the workflow engine, its
//! persistence adapters, and the CLI: workflows, tasks, executions, task logs,
//! engine configuration, and the request/response shapes of the outbound
//! language-model and HTTP collaborators.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod workflow;
