use std::io::{self, Write};

use serde::Serialize;

use crate::app::{EventLevel, ProgressEvent, ProgressSink, RunSummary};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn event(&self, event: ProgressEvent) {
        let stage = event.stage.to_string();
        let elapsed_ms = event.elapsed.map(|elapsed| elapsed.as_millis() as u64);
        match event.level {
            EventLevel::Debug => tracing::debug!(stage, elapsed_ms, "{}", event.message),
            EventLevel::Info => tracing::info!(stage, elapsed_ms, "{}", event.message),
            EventLevel::Warn => tracing::warn!(stage, elapsed_ms, "{}", event.message),
        }
    }
}
