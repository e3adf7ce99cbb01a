//! FileSink - appends records to a JSON Lines file

use contracts::{ContractError, Record, RecordSink};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file, one JSON object per line
    pub path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let path = params
            .get("path")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                ContractError::config_validation("sink.params.path", "file sink requires 'path'")
            })?;

        Ok(Self { path })
    }
}

/// Sink that appends records to disk
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Create a new FileSink, creating parent directories as needed
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let config = FileSinkConfig::from_params(params)?;
        Ok(Self::new(name, config)?)
    }

    fn append_line(&mut self, record: &Record) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file sink already closed"))?;

        serde_json::to_writer(&mut *writer, record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(b"\n")?;
        // 每条记录落盘，进程崩溃时不丢已投递的记录
        writer.flush()
    }

    fn persist_record(&mut self, record: &Record) -> Result<(), ContractError> {
        self.append_line(record).map_err(|e| {
            error!(sink = %self.name, path = %self.config.path.display(), error = %e, "Write failed");
            ContractError::sink_send(&self.name, e.to_string())
        })
    }
}

impl RecordSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_sink_send", skip(self, record), fields(sink = %self.name))]
    async fn send(&mut self, record: &Record) -> Result<(), ContractError> {
        self.persist_record(record)
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_sink_appends_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("reports.jsonl");
        let config = FileSinkConfig { path: path.clone() };

        let mut sink = FileSink::new("test_file", config).unwrap();
        sink.send(&Record::new().with("message", "first")).await.unwrap();
        sink.send(&Record::new().with("message", "second")).await.unwrap();

        // Flushed per record, readable before close.
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<Record> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].get("message"), Some("second"));

        sink.close().await.unwrap();
        assert!(sink.send(&Record::new()).await.is_err());
    }

    #[test]
    fn test_config_requires_path() {
        let err = FileSinkConfig::from_params(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("path"));
    }
}
