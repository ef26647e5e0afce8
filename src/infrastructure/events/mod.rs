//! Event Sink Implementations
//!
//! Concrete implementations of `PipelineEventSink`:
//! - JsonEventSink: NDJSON output for CI/automation
//!
//! The human-readable sink lives in `presentation::output`.

mod json;

pub use json::JsonEventSink;
