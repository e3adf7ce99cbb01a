//! NetworkSink - one UDP datagram per record

use contracts::{ContractError, Record, RecordSink};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, instrument};

/// Serialization format for network transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Collector address
    pub addr: SocketAddr,
    /// Serialization format
    pub format: NetworkFormat,
    /// Max datagram size (UDP payload limit is 65507 for IPv4)
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let addr_str = params.get("addr").ok_or_else(|| {
            ContractError::config_validation("sink.params.addr", "missing 'addr' parameter")
        })?;

        let addr: SocketAddr = addr_str.parse().map_err(|e| {
            ContractError::config_validation(
                "sink.params.addr",
                format!("invalid address '{addr_str}': {e}"),
            )
        })?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => NetworkFormat::Bincode,
            Some("json") | None => NetworkFormat::Json,
            Some(other) => {
                return Err(ContractError::config_validation(
                    "sink.params.format",
                    format!("unknown format '{other}'"),
                ))
            }
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Wire envelope: the record plus the collector credential
#[derive(Serialize)]
struct Envelope<'a> {
    access_token: &'a str,
    record: &'a Record,
}

/// Sink that sends records to a collector over UDP
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    access_token: String,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    /// Create a new NetworkSink
    #[instrument(name = "network_sink_new", skip(name, config, access_token))]
    pub async fn new(
        name: impl Into<String>,
        config: NetworkSinkConfig,
        access_token: impl Into<String>,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let bind_addr: SocketAddr = if config.addr.is_ipv6() {
            ([0u16; 8], 0).into()
        } else {
            ([0, 0, 0, 0], 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(&config.addr).await?;

        debug!(
            sink = %name,
            target = %config.addr,
            format = ?config.format,
            "NetworkSink connected"
        );

        Ok(Self {
            name,
            config,
            access_token: access_token.into(),
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_sink_from_params", skip(name, params, access_token))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
        access_token: &str,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)?;

        Self::new(name.clone(), config, access_token)
            .await
            .map_err(|e| ContractError::sink_connection(name, e.to_string()))
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>, ContractError> {
        let envelope = Envelope {
            access_token: &self.access_token,
            record,
        };

        let data = match self.config.format {
            NetworkFormat::Json => serde_json::to_vec(&envelope)
                .map_err(|e| ContractError::encode(&self.name, format!("json error: {e}")))?,
            NetworkFormat::Bincode => bincode::serialize(&envelope)
                .map_err(|e| ContractError::encode(&self.name, format!("bincode error: {e}")))?,
        };

        if data.len() > self.config.max_packet_size {
            return Err(ContractError::encode(
                &self.name,
                format!(
                    "payload of {} bytes exceeds max_packet_size {}",
                    data.len(),
                    self.config.max_packet_size
                ),
            ));
        }

        Ok(data)
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_send(&self.name, "socket not connected"))
    }
}

impl RecordSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "network_sink_send", skip(self, record), fields(sink = %self.name))]
    async fn send(&mut self, record: &Record) -> Result<(), ContractError> {
        let data = self.encode(record)?;
        let socket = self.socket()?;

        let sent = socket
            .send(&data)
            .await
            .map_err(|e| ContractError::sink_send(&self.name, format!("udp send failed: {e}")))?;

        debug!(sink = %self.name, bytes = sent, "Sent");
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}
