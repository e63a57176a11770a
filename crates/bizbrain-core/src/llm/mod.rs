//! Language-model collaborator abstractions for BizBrain.
//!
//! - `LlmClient`: RPITIT trait for concrete client implementations
//! - `BoxLlmClient`: object-safe wrapper for dynamic dispatch

pub mod box_client;
pub mod client;
