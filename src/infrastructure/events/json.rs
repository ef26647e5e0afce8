//! JSON Event Sink
//!
//! Outputs pipeline events as NDJSON for CI/automation consumption.

use crate::domain::ports::{PipelineEvent, PipelineEventSink};
use serde_json::json;
use std::io::{self, Write};
use std::sync::Mutex;

/// Event sink that outputs NDJSON events to stdout
pub struct JsonEventSink {
    /// Mutex to ensure thread-safe writes
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonEventSink {
    /// Create a new JSON event sink writing to stdout
    pub fn stdout() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stdout())),
        }
    }

    /// Create a JSON event sink writing to a custom writer
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    fn write_event(&self, event: serde_json::Value) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", event);
            let _ = writer.flush();
        }
    }
}

fn event_json(event: PipelineEvent) -> serde_json::Value {
    match event {
        PipelineEvent::Started {
            environment,
            topology,
            phase_count,
        } => json!({
            "event": "start",
            "environment": environment,
            "topology": topology,
            "phase_count": phase_count,
        }),

        PipelineEvent::PhaseStarted { index, name } => json!({
            "event": "phase_start",
            "index": index,
            "phase": name,
        }),

        PipelineEvent::PhaseCompleted {
            index,
            name,
            elapsed,
        } => json!({
            "event": "phase_complete",
            "index": index,
            "phase": name,
            "elapsed_ms": elapsed.as_millis() as u64,
        }),

        PipelineEvent::PhaseSkipped {
            index,
            name,
            reason,
        } => json!({
            "event": "phase_skipped",
            "index": index,
            "phase": name,
            "reason": reason,
        }),

        PipelineEvent::PhaseDegraded {
            index,
            name,
            reason,
        } => json!({
            "event": "phase_degraded",
            "index": index,
            "phase": name,
            "reason": reason,
        }),

        PipelineEvent::PhaseFailed {
            index,
            name,
            error,
            fatal,
        } => json!({
            "event": "phase_failed",
            "index": index,
            "phase": name,
            "error": error,
            "fatal": fatal,
        }),

        PipelineEvent::Step { message } => json!({
            "event": "step",
            "message": message,
        }),

        PipelineEvent::Warning { message } => json!({
            "event": "warning",
            "message": message,
        }),

        PipelineEvent::Finished {
            environment,
            exit_code,
            degraded_count,
        } => {
            let status = match (exit_code, degraded_count) {
                (0, 0) => "success",
                (0, _) => "degraded",
                _ => "failed",
            };
            json!({
                "event": "complete",
                "environment": environment,
                "status": status,
                "exit_code": exit_code,
                "degraded": degraded_count,
            })
        }

        PipelineEvent::EnvironmentSkipped {
            environment,
            reason,
        } => json!({
            "event": "environment_skipped",
            "environment": environment,
            "reason": reason,
        }),
    }
}

impl PipelineEventSink for JsonEventSink {
    fn on_event(&self, event: PipelineEvent) {
        self.write_event(event_json(event));
    }

    fn wants_detailed_events(&self) -> bool {
        true // JSON mode wants all events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct TestWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl TestWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buffer = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    buffer: buffer.clone(),
                },
                buffer,
            )
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buffer.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn lines(buffer: &Arc<Mutex<Vec<u8>>>) -> Vec<serde_json::Value> {
        let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn json_sink_outputs_start_event() {
        let (writer, buffer) = TestWriter::new();
        let sink = JsonEventSink::with_writer(writer);

        sink.on_event(PipelineEvent::Started {
            environment: "hub".to_string(),
            topology: "direct".to_string(),
            phase_count: 11,
        });

        let events = lines(&buffer);
        assert_eq!(events[0]["event"], "start");
        assert_eq!(events[0]["phase_count"], 11);
    }

    #[test]
    fn json_sink_writes_one_line_per_event() {
        let (writer, buffer) = TestWriter::new();
        let sink = JsonEventSink::with_writer(writer);

        sink.on_event(PipelineEvent::PhaseStarted {
            index: 2,
            name: "vault".to_string(),
        });
        sink.on_event(PipelineEvent::PhaseCompleted {
            index: 2,
            name: "vault".to_string(),
            elapsed: Duration::from_millis(1500),
        });

        let events = lines(&buffer);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1]["event"], "phase_complete");
        assert_eq!(events[1]["elapsed_ms"], 1500);
    }

    #[test]
    fn json_sink_marks_fatal_failures() {
        let (writer, buffer) = TestWriter::new();
        let sink = JsonEventSink::with_writer(writer);

        sink.on_event(PipelineEvent::PhaseFailed {
            index: 7,
            name: "open-tunnel".to_string(),
            error: "tunnel exited".to_string(),
            fatal: true,
        });

        let events = lines(&buffer);
        assert_eq!(events[0]["event"], "phase_failed");
        assert_eq!(events[0]["fatal"], true);
    }

    #[test]
    fn json_sink_reports_degraded_completion() {
        let (writer, buffer) = TestWriter::new();
        let sink = JsonEventSink::with_writer(writer);

        sink.on_event(PipelineEvent::Finished {
            environment: "edge".to_string(),
            exit_code: 0,
            degraded_count: 2,
        });
        sink.on_event(PipelineEvent::Finished {
            environment: "edge".to_string(),
            exit_code: 1,
            degraded_count: 0,
        });

        let events = lines(&buffer);
        assert_eq!(events[0]["status"], "degraded");
        assert_eq!(events[1]["status"], "failed");
    }
}
