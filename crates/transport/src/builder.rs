//! Builder - turns a `SinkConfig` into a running transport

use tracing::{info, instrument};

use contracts::{SinkConfig, SinkType};

use crate::buffered::BufferedTransport;
use crate::error::TransportError;
use crate::sinks::{ConfiguredSink, FileSink, LogSink, NetworkSink};

/// Builder for creating a BufferedTransport from configuration
pub struct TransportBuilder {
    config: SinkConfig,
    access_token: String,
}

impl TransportBuilder {
    /// Create a new TransportBuilder
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            access_token: String::new(),
        }
    }

    /// Credential forwarded to sinks that talk to a collector
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }

    /// Override the configured queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Build the sink and start the worker
    #[instrument(name = "transport_builder_build", skip(self), fields(sink = %self.config.name))]
    pub async fn build(self) -> Result<BufferedTransport, TransportError> {
        let sink = create_sink(&self.config, &self.access_token).await?;
        let transport = BufferedTransport::spawn(sink, self.config.queue_capacity);

        info!(
            sink = %self.config.name,
            sink_type = ?self.config.sink_type,
            capacity = transport.capacity(),
            "Transport started"
        );

        Ok(transport)
    }
}

/// Create a sink from configuration
#[instrument(
    name = "transport_create_sink",
    skip(config, access_token),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub async fn create_sink(
    config: &SinkConfig,
    access_token: &str,
) -> Result<ConfiguredSink, TransportError> {
    match config.sink_type {
        SinkType::Log => Ok(ConfiguredSink::Log(LogSink::new(&config.name))),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| TransportError::sink_creation(&config.name, e.to_string()))?;
            Ok(ConfiguredSink::File(sink))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params, access_token)
                .await
                .map_err(|e| TransportError::sink_creation(&config.name, e.to_string()))?;
            Ok(ConfiguredSink::Network(sink))
        }
    }
}

/// Convenience function to create a transport from a sink config
pub async fn create_transport(
    config: &SinkConfig,
    access_token: &str,
) -> Result<BufferedTransport, TransportError> {
    TransportBuilder::new(config.clone())
        .access_token(access_token)
        .build()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffered::Lifecycle;
    use contracts::Record;
    use std::collections::HashMap;

    fn sink_config(sink_type: SinkType, params: &[(&str, &str)]) -> SinkConfig {
        SinkConfig {
            name: "test".to_string(),
            sink_type,
            queue_capacity: 8,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn test_create_log_transport() {
        let config = sink_config(SinkType::Log, &[]);
        let transport = create_transport(&config, "").await.unwrap();
        assert_eq!(transport.name(), "test");
        assert_eq!(transport.capacity(), 8);

        transport.send(Record::new().with("message", "hello")).unwrap();
        transport.close().await.unwrap();
        assert_eq!(transport.lifecycle(), Lifecycle::Closed);
        assert_eq!(transport.metrics().delivered_count(), 1);
    }

    #[tokio::test]
    async fn test_create_file_transport_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let config = sink_config(SinkType::File, &[("path", path.to_str().unwrap())]);

        let transport = TransportBuilder::new(config)
            .queue_capacity(2)
            .build()
            .await
            .unwrap();
        assert_eq!(transport.capacity(), 2);

        transport.send(Record::new().with("n", "1")).unwrap();
        transport.wait().await;
        transport.send(Record::new().with("n", "2")).unwrap();
        transport.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_sink_params_fail_creation() {
        let file = sink_config(SinkType::File, &[]);
        let err = create_transport(&file, "").await.unwrap_err();
        assert!(matches!(err, TransportError::SinkCreation { .. }));

        let network = sink_config(SinkType::Network, &[("addr", "not-an-addr")]);
        let err = create_transport(&network, "tok").await.unwrap_err();
        assert!(matches!(err, TransportError::SinkCreation { .. }));
    }
}
