//! Newline-delimited JSON event output.

use gramflow_core_types::{EventSink, RunEvent};
use std::io::Write;
use tracing::debug;

/// Writes one JSON object per line to stdout. Stdout carries only events;
/// human-readable logging goes to stderr.
#[derive(Debug, Default)]
pub struct NdjsonSink;

impl NdjsonSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for NdjsonSink {
    fn emit(&self, event: RunEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                if writeln!(handle, "{line}").and_then(|()| handle.flush()).is_err() {
                    debug!("event consumer went away");
                }
            }
            Err(err) => debug!(error = %err, "event serialization failed"),
        }
    }
}
