//! RecordSink trait - Transport output interface
//!
//! Defines the abstract interface for delivery sinks.

use crate::{ContractError, Record};

/// Delivery sink trait
///
/// The buffered transport calls these methods from a single worker only:
/// one record at a time, in submission order, never concurrently.
/// `close` is called exactly once and implementations need not be idempotent.
#[trait_variant::make(RecordSink: Send)]
pub trait LocalRecordSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one record
    ///
    /// May take as long as the remote end needs.
    ///
    /// # Errors
    /// Returns delivery error (should include context). The transport does
    /// not retry.
    async fn send(&mut self, record: &Record) -> Result<(), ContractError>;

    /// Release resources after the last record
    async fn close(&mut self) -> Result<(), ContractError>;
}
