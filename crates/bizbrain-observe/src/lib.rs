//! Observability setup for BizBrain binaries: structured logging and
//! optional OpenTelemetry span export.

pub mod tracing_setup;
