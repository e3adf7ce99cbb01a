//! BufferedTransport - bounded queue in front of a single sink worker
//!
//! Producers enqueue operations from any thread; exactly one worker task
//! dequeues them in FIFO order and is the only caller of the sink.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{oneshot, watch, Semaphore};
use tracing::{debug, error, instrument, warn};

use contracts::{ContractError, Record, RecordSink};
use observability::{
    record_queue_depth, record_record_delivered, record_record_dropped, record_record_enqueued,
    record_send_latency_ms, DROP_BUFFER_FULL, DROP_CLOSED,
};

use crate::error::TransportError;
use crate::metrics::TransportMetrics;

/// Largest queue capacity the channel can represent
pub const MAX_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// Lifecycle of a transport. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Accepting sends and waits
    Open,
    /// A close was requested; sends are rejected while the queue drains
    Closing,
    /// Worker exited and the sink has been closed
    Closed,
}

/// One unit of work for the worker
enum Operation {
    /// Deliver this record to the sink
    Send(Record),
    /// Flush barrier; fired when the worker reaches it
    Wait(oneshot::Sender<()>),
    /// Terminal marker; carries the sink close result back to the first closer
    Close(oneshot::Sender<Result<(), ContractError>>),
}

struct Shared {
    name: String,
    capacity: usize,
    queue: mpsc::Sender<Operation>,
    /// Held while `send` checks the lifecycle and enqueues, and while `close`
    /// flips Open -> Closing, so a racing send lands either before the close
    /// marker or is rejected.
    admission: Mutex<()>,
    runtime: Handle,
    state: Arc<watch::Sender<Lifecycle>>,
    metrics: Arc<TransportMetrics>,
}

/// Handle to a running transport worker
///
/// Cheap to clone; all clones feed the same queue. When every clone is
/// dropped without `close`, the worker drains the queue and closes the sink.
#[derive(Clone)]
pub struct BufferedTransport {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for BufferedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedTransport")
            .field("name", &self.shared.name)
            .field("capacity", &self.shared.capacity)
            .finish_non_exhaustive()
    }
}

impl BufferedTransport {
    /// Create a new BufferedTransport and spawn the worker task
    ///
    /// Must be called within a tokio runtime. A capacity of 0 is coerced to 1,
    /// one above [`MAX_CAPACITY`] is clamped to it.
    pub fn spawn<S: RecordSink + Send + 'static>(sink: S, capacity: usize) -> Self {
        let name = sink.name().to_string();
        let capacity = match capacity {
            0 => {
                warn!(sink = %name, "Queue capacity 0 is not allowed, using 1");
                1
            }
            n if n > MAX_CAPACITY => {
                warn!(
                    sink = %name,
                    requested = n,
                    max = MAX_CAPACITY,
                    "Queue capacity too large, clamping"
                );
                MAX_CAPACITY
            }
            n => n,
        };

        let (queue, rx) = mpsc::channel(capacity);
        let (state, _) = watch::channel(Lifecycle::Open);
        let state = Arc::new(state);
        let metrics = Arc::new(TransportMetrics::new());

        tokio::spawn(run_worker(
            sink,
            rx,
            Arc::clone(&state),
            Arc::clone(&metrics),
            name.clone(),
        ));

        Self {
            shared: Arc::new(Shared {
                name,
                capacity,
                queue,
                admission: Mutex::new(()),
                runtime: Handle::current(),
                state,
                metrics,
            }),
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Queue capacity fixed at construction
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        *self.shared.state.borrow()
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<TransportMetrics> {
        &self.shared.metrics
    }

    /// Enqueue a record for delivery without waiting
    ///
    /// Success means the record was accepted, not that it was delivered.
    ///
    /// # Errors
    /// - [`TransportError::BufferFull`] when the queue is at capacity. Callers
    ///   on a hot path should drop the record rather than retry in a loop.
    /// - [`TransportError::Closed`] once `close` has been called.
    pub fn send(&self, record: Record) -> Result<(), TransportError> {
        let admission = self.shared.admission.lock();
        self.admit(record, admission)
    }

    /// Like [`send`](Self::send) but never waits for the admission lock
    ///
    /// For callers that may run while the current thread is already inside
    /// `send`, such as a panic hook.
    ///
    /// # Errors
    /// As `send`, plus [`TransportError::Busy`] when the lock is held.
    pub fn try_send(&self, record: Record) -> Result<(), TransportError> {
        match self.shared.admission.try_lock() {
            Some(admission) => self.admit(record, admission),
            None => Err(TransportError::Busy {
                sink: self.shared.name.clone(),
            }),
        }
    }

    fn admit(
        &self,
        record: Record,
        _admission: MutexGuard<'_, ()>,
    ) -> Result<(), TransportError> {
        let shared = &*self.shared;
        let lifecycle = *shared.state.borrow();
        if lifecycle != Lifecycle::Open {
            return Err(self.reject_closed());
        }

        match shared.queue.try_send(Operation::Send(record)) {
            Ok(()) => {
                let depth = shared.capacity - shared.queue.capacity();
                shared.metrics.inc_enqueued_count();
                shared.metrics.set_queue_len(depth);
                record_record_enqueued(&shared.name);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                shared.metrics.inc_dropped_count();
                record_record_dropped(&shared.name, DROP_BUFFER_FULL);
                debug!(sink = %shared.name, "Queue full, record dropped");
                Err(TransportError::BufferFull {
                    sink: shared.name.clone(),
                })
            }
            Err(TrySendError::Closed(_)) => {
                error!(sink = %shared.name, "Transport worker exited unexpectedly");
                Err(self.reject_closed())
            }
        }
    }

    /// Wait until every record accepted before this call has been handed to the sink
    ///
    /// Returns immediately once the transport is closed. Waits for queue
    /// space if necessary, but never past shutdown.
    #[instrument(name = "transport_wait", skip(self), fields(sink = %self.shared.name))]
    pub async fn wait(&self) {
        let mut state = self.shared.state.subscribe();
        let lifecycle = *state.borrow_and_update();
        if lifecycle != Lifecycle::Open {
            // The pending close drains everything accepted so far.
            closed(&mut state).await;
            return;
        }

        let (signal, reached) = oneshot::channel();
        if !self.enqueue(Operation::Wait(signal), &mut state).await {
            return;
        }

        tokio::select! {
            _ = reached => {}
            _ = closed(&mut state) => {}
        }
    }

    /// Drain the queue, close the sink and stop the worker
    ///
    /// Idempotent: only the first call enqueues the close marker, every call
    /// returns once shutdown has completed.
    ///
    /// # Errors
    /// Returns [`TransportError::Sink`] to the first caller if the sink's own
    /// close failed.
    #[instrument(name = "transport_close", skip(self), fields(sink = %self.shared.name))]
    pub async fn close(&self) -> Result<(), TransportError> {
        let mut state = self.shared.state.subscribe();

        let first = {
            let _admission = self.shared.admission.lock();
            self.shared.state.send_if_modified(|lifecycle| {
                if *lifecycle == Lifecycle::Open {
                    *lifecycle = Lifecycle::Closing;
                    true
                } else {
                    false
                }
            })
        };

        if !first {
            closed(&mut state).await;
            return Ok(());
        }

        debug!(sink = %self.shared.name, "Close requested, draining queue");

        let result = self.enqueue_close().await;
        closed(&mut state).await;

        match result {
            Ok(Ok(())) => {
                debug!(sink = %self.shared.name, "Transport closed");
                Ok(())
            }
            Ok(Err(e)) => Err(TransportError::Sink(e)),
            Err(_) => {
                error!(sink = %self.shared.name, "Worker exited without acknowledging close");
                Ok(())
            }
        }
    }

    /// Blocking variant of [`wait`](Self::wait) for synchronous callers
    ///
    /// Must not be called from a thread that drives the runtime hosting the
    /// worker (e.g. inside an async task on a current-thread runtime).
    pub fn blocking_wait(&self) {
        futures::executor::block_on(self.wait());
    }

    /// Blocking variant of [`close`](Self::close); same caveats as
    /// [`blocking_wait`](Self::blocking_wait).
    pub fn blocking_close(&self) -> Result<(), TransportError> {
        futures::executor::block_on(self.close())
    }

    /// Enqueue the close marker from a detached task
    ///
    /// Once `Closing` is published the marker must reach the worker even if
    /// this caller is cancelled, otherwise later closers and waiters hang.
    fn enqueue_close(&self) -> oneshot::Receiver<Result<(), ContractError>> {
        let (reply, outcome) = oneshot::channel();
        let queue = self.shared.queue.clone();
        let name = self.shared.name.clone();
        self.shared.runtime.spawn(async move {
            if queue.send(Operation::Close(reply)).await.is_err() {
                warn!(sink = %name, "Worker stopped before close was enqueued");
            }
        });
        outcome
    }

    /// Enqueue, waiting for space. Returns false if shutdown finished first.
    async fn enqueue(&self, op: Operation, state: &mut watch::Receiver<Lifecycle>) -> bool {
        tokio::select! {
            biased;
            _ = closed(state) => false,
            sent = self.shared.queue.send(op) => sent.is_ok(),
        }
    }

    fn reject_closed(&self) -> TransportError {
        let shared = &*self.shared;
        shared.metrics.inc_rejected_count();
        record_record_dropped(&shared.name, DROP_CLOSED);
        TransportError::Closed {
            sink: shared.name.clone(),
        }
    }
}

/// Resolve once the worker has published `Closed`
async fn closed(state: &mut watch::Receiver<Lifecycle>) {
    // Err means the sender is gone, which only happens after the worker exited.
    let _ = state.wait_for(|lifecycle| *lifecycle == Lifecycle::Closed).await;
}

/// Publishes `Closed` when the worker exits, including by unwinding
struct PublishClosed(Arc<watch::Sender<Lifecycle>>);

impl Drop for PublishClosed {
    fn drop(&mut self) {
        self.0.send_replace(Lifecycle::Closed);
    }
}

/// Worker task that consumes operations and drives the sink
#[instrument(
    name = "transport_worker_loop",
    skip(sink, rx, state, metrics, name),
    fields(sink = %name)
)]
async fn run_worker<S: RecordSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Operation>,
    state: Arc<watch::Sender<Lifecycle>>,
    metrics: Arc<TransportMetrics>,
    name: String,
) {
    let _publish_closed = PublishClosed(state);
    debug!(sink = %name, "Transport worker started");

    let mut close_reply = None;
    while let Some(op) = rx.recv().await {
        metrics.set_queue_len(rx.len());
        record_queue_depth(&name, rx.len());

        match op {
            Operation::Send(record) => deliver(&mut sink, &record, &metrics, &name).await,
            Operation::Wait(signal) => {
                let _ = signal.send(());
            }
            Operation::Close(reply) => {
                close_reply = Some(reply);
                break;
            }
        }
    }

    // Nothing behind the close marker is processed; dropping pending waits
    // releases their callers.
    rx.close();
    let mut discarded = 0usize;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        debug!(sink = %name, discarded, "Discarded operations queued behind close");
    }
    metrics.set_queue_len(0);

    let result = sink.close().await;
    if let Err(ref e) = result {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    match close_reply {
        Some(reply) => {
            let _ = reply.send(result);
        }
        None => debug!(sink = %name, "All transport handles dropped"),
    }

    debug!(sink = %name, "Transport worker stopped");
}

async fn deliver<S: RecordSink>(
    sink: &mut S,
    record: &Record,
    metrics: &TransportMetrics,
    name: &str,
) {
    let started = Instant::now();
    let result = sink.send(record).await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    metrics.observe_send_latency_ms(latency_ms);
    record_send_latency_ms(name, latency_ms);

    match result {
        Ok(()) => {
            metrics.inc_delivered_count();
            record_record_delivered(name, true);
        }
        Err(e) => {
            // Not retried; the producer already returned.
            metrics.inc_failure_count();
            record_record_delivered(name, false);
            error!(sink = %name, error = %e, "Send failed");
        }
    }
}
