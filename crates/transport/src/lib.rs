//! # Transport
//!
//! 缓冲投递模块。
//!
//! 负责：
//! - 非阻塞接收 `Record`，队列满时返回背压错误
//! - 单个 worker 按 FIFO 顺序串行调用 sink
//! - `wait` 刷新屏障与 `close` 先排空再关闭

pub mod buffered;
pub mod builder;
pub mod error;
pub mod metrics;
pub mod sinks;

pub use buffered::{BufferedTransport, Lifecycle, MAX_CAPACITY};
pub use builder::{create_sink, create_transport, TransportBuilder};
pub use contracts::{Record, RecordSink};
pub use error::TransportError;
pub use metrics::{MetricsSnapshot, TransportMetrics};
pub use sinks::{ConfiguredSink, FileSink, LogSink, NetworkFormat, NetworkSink};
