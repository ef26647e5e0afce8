//! Pipeline Event Port
//!
//! Observable interface for pipeline runs.
//! Enables progress reporting, JSON event streams, and testing.

use std::time::Duration;

/// Event emitted while an environment is being deployed
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Pipeline started for one environment
    Started {
        environment: String,
        topology: String,
        phase_count: usize,
    },

    /// Phase is about to run
    PhaseStarted { index: usize, name: String },

    /// Phase finished successfully
    PhaseCompleted {
        index: usize,
        name: String,
        elapsed: Duration,
    },

    /// Phase precondition said "not applicable"
    PhaseSkipped {
        index: usize,
        name: String,
        reason: String,
    },

    /// Phase finished but left something unverified
    PhaseDegraded {
        index: usize,
        name: String,
        reason: String,
    },

    /// Phase failed; `fatal` means the pipeline stops here
    PhaseFailed {
        index: usize,
        name: String,
        error: String,
        fatal: bool,
    },

    /// Progress inside a phase (e.g. one add-on being installed)
    Step { message: String },

    /// Recovered problem the operator should know about
    Warning { message: String },

    /// Pipeline finished
    Finished {
        environment: String,
        exit_code: i32,
        degraded_count: usize,
    },

    /// Aggregate run did not start an environment
    EnvironmentSkipped { environment: String, reason: String },
}

/// Trait for receiving pipeline events
///
/// Implementations can be:
/// - ConsoleEventSink: human-readable lines on stderr
/// - JsonEventSink: NDJSON event stream for CI
/// - NoopEventSink: Silent operation
pub trait PipelineEventSink: Send + Sync {
    /// Handle a pipeline event
    fn on_event(&self, event: PipelineEvent);

    /// Check if this sink wants in-phase step events
    fn wants_detailed_events(&self) -> bool {
        true
    }
}

/// No-op event sink for silent operation
pub struct NoopEventSink;

impl PipelineEventSink for NoopEventSink {
    fn on_event(&self, _event: PipelineEvent) {}

    fn wants_detailed_events(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingEventSink {
        events: Arc<Mutex<Vec<PipelineEvent>>>,
    }

    impl PipelineEventSink for RecordingEventSink {
        fn on_event(&self, event: PipelineEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn recording_sink_captures_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingEventSink {
            events: events.clone(),
        };

        sink.on_event(PipelineEvent::Started {
            environment: "hub".to_string(),
            topology: "direct".to_string(),
            phase_count: 12,
        });
        sink.on_event(PipelineEvent::PhaseStarted {
            index: 0,
            name: "provision".to_string(),
        });

        let recorded = events.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert!(sink.wants_detailed_events());
    }

    #[test]
    fn noop_sink_wants_no_details() {
        assert!(!NoopEventSink.wants_detailed_events());
    }
}
