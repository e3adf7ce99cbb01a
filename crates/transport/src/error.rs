//! Transport error types

use thiserror::Error;

/// Transport-specific errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Queue full - record dropped
    #[error("message buffer full for sink '{sink}'")]
    BufferFull { sink: String },

    /// Admission lock held elsewhere; only returned by `try_send`
    #[error("transport for sink '{sink}' busy")]
    Busy { sink: String },

    /// Shutdown already began - record dropped
    #[error("transport for sink '{sink}' closed")]
    Closed { sink: String },

    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Sink error (from contract), only surfaced by `close`
    #[error("sink error: {0}")]
    Sink(#[from] contracts::ContractError),
}

impl TransportError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether this is the backpressure signal
    pub fn is_buffer_full(&self) -> bool {
        matches!(self, Self::BufferFull { .. })
    }

    /// Whether the transport has permanently stopped accepting records
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}
