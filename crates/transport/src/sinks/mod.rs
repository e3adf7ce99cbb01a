//! Sink implementations
//!
//! Contains LogSink, FileSink, NetworkSink, and the [`ConfiguredSink`]
//! wrapper the factory hands to the transport.

mod file;
mod log;
mod network;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::network::{NetworkFormat, NetworkSink, NetworkSinkConfig};

use contracts::{ContractError, Record, RecordSink};

/// A sink chosen at runtime from `SinkConfig`
///
/// `RecordSink` returns `impl Future`, so it cannot be boxed as a trait
/// object; this enum dispatches statically instead.
pub enum ConfiguredSink {
    Log(LogSink),
    File(FileSink),
    Network(NetworkSink),
}

impl RecordSink for ConfiguredSink {
    fn name(&self) -> &str {
        match self {
            Self::Log(sink) => sink.name(),
            Self::File(sink) => sink.name(),
            Self::Network(sink) => sink.name(),
        }
    }

    async fn send(&mut self, record: &Record) -> Result<(), ContractError> {
        match self {
            Self::Log(sink) => sink.send(record).await,
            Self::File(sink) => sink.send(record).await,
            Self::Network(sink) => sink.send(record).await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Log(sink) => sink.close().await,
            Self::File(sink) => sink.close().await,
            Self::Network(sink) => sink.close().await,
        }
    }
}
