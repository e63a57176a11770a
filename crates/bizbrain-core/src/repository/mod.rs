//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (bizbrain-infra) implements. The core crate never depends on any
//! specific storage technology; `memory` is the process-local implementation
//! used for dry runs and tests.

pub mod memory;
pub mod workflow;
