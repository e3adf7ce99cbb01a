//! LogSink - logs each record via tracing

use contracts::{ContractError, Record, RecordSink};
use tracing::{info, instrument};

/// Sink that logs records for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_record(&self, record: &Record) {
        let rendered = serde_json::to_string(record).unwrap_or_default();

        info!(
            sink = %self.name,
            level = record.get("level").unwrap_or("-"),
            fields = record.len(),
            record = %rendered,
            "Record delivered"
        );
    }
}

impl RecordSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_send", skip(self, record), fields(sink = %self.name))]
    async fn send(&mut self, record: &Record) -> Result<(), ContractError> {
        self.log_record(record);
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
