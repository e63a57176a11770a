//! Workflow engine core: graph validation, task execution, and run recording.
//!
//! - `bundle` -- YAML/JSON workflow bundles: parsing, validation, import
//! - `graph` -- task graph builder, cycle detection, topological order
//! - `context` -- per-task execution context (input, upstream results, loop item)
//! - `expression` -- restricted condition expression interpreter
//! - `guard` -- retry/timeout guard around every task attempt
//! - `recorder` -- append-only task log and execution status updates
//! - `task_runner` -- executors for the LLM, API, Condition, Loop, and Parallel kinds
//! - `engine` -- worklist walk over the graph with bounded concurrency

pub mod bundle;
pub mod context;
pub mod engine;
pub mod expression;
pub mod graph;
pub mod guard;
pub mod recorder;
pub mod task_runner;
