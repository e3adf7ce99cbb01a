//! Transport metrics for observability

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use observability::{RunningStats, StatsSummary};
use parking_lot::Mutex;

/// Metrics for a single transport
#[derive(Debug, Default)]
pub struct TransportMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Records accepted by `send`
    enqueued_count: AtomicU64,
    /// Records the sink accepted
    delivered_count: AtomicU64,
    /// Records the sink failed to deliver
    failure_count: AtomicU64,
    /// Records rejected because the queue was full
    dropped_count: AtomicU64,
    /// Records rejected because shutdown had begun
    rejected_count: AtomicU64,
    /// Sink send latency in milliseconds
    send_latency_ms: Mutex<RunningStats>,
}

impl TransportMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn enqueued_count(&self) -> u64 {
        self.enqueued_count.load(Ordering::Relaxed)
    }

    pub fn inc_enqueued_count(&self) {
        self.enqueued_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    pub fn inc_delivered_count(&self) {
        self.delivered_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    pub fn inc_rejected_count(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one sink send duration
    pub fn observe_send_latency_ms(&self, latency_ms: f64) {
        self.send_latency_ms.lock().push(latency_ms);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            enqueued_count: self.enqueued_count(),
            delivered_count: self.delivered_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
            rejected_count: self.rejected_count(),
            send_latency_ms: StatsSummary::from(&*self.send_latency_ms.lock()),
        }
    }
}

/// Snapshot of transport metrics (for reporting)
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub enqueued_count: u64,
    pub delivered_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
    pub rejected_count: u64,
    pub send_latency_ms: StatsSummary,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(f, "Accepted: {}", self.enqueued_count)?;
        writeln!(f, "Delivered: {}", self.delivered_count)?;
        writeln!(f, "Sink failures: {}", self.failure_count)?;
        writeln!(f, "Dropped (buffer full): {}", self.dropped_count)?;
        writeln!(f, "Rejected (closed): {}", self.rejected_count)?;
        writeln!(f, "Pending: {}", self.queue_len)?;
        write!(f, "Send latency (ms): {}", self.send_latency_ms)
    }
}
