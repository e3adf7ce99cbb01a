//! ReportLayer - tracing events to report records

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use contracts::{Record, Severity};
use observability::{record_event_ignored, record_event_reported};
use transport::BufferedTransport;

use crate::fields::{FieldCollector, SEVERITY_FIELD};
use crate::policy::IgnorePolicy;

/// Targets whose events are never reported; the transport logs its own
/// failures and reporting them would feed back into the queue.
const SELF_TARGETS: [&str; 2] = ["transport", "report_hook"];

/// Counters shared between a layer and its guard
#[derive(Debug, Default)]
pub struct HookStats {
    reported: AtomicU64,
    ignored: AtomicU64,
    dropped: AtomicU64,
}

impl HookStats {
    /// Records accepted by the transport
    pub fn reported(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }

    /// Events filtered by the ignore policy
    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Records the transport refused (buffer full or closed)
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// `tracing_subscriber` layer that reports events at trigger severities
#[derive(Clone)]
pub struct ReportLayer {
    transport: BufferedTransport,
    environment: String,
    levels: Vec<Severity>,
    policy: IgnorePolicy,
    stats: Arc<HookStats>,
}

impl ReportLayer {
    /// Layer with the default trigger levels (error, critical)
    pub fn new(transport: BufferedTransport, environment: impl Into<String>) -> Self {
        Self {
            transport,
            environment: environment.into(),
            levels: Severity::DEFAULT_TRIGGERS.to_vec(),
            policy: IgnorePolicy::default(),
            stats: Arc::new(HookStats::default()),
        }
    }

    pub fn with_levels(mut self, levels: impl Into<Vec<Severity>>) -> Self {
        self.levels = levels.into();
        self
    }

    pub fn with_policy(mut self, policy: IgnorePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn levels(&self) -> &[Severity] {
        &self.levels
    }

    pub fn stats(&self) -> Arc<HookStats> {
        Arc::clone(&self.stats)
    }

    /// Build the record for an event, or `None` if it should not be reported
    fn build_record(&self, event: &Event<'_>) -> Option<Record> {
        let metadata = event.metadata();
        if is_self_target(metadata.target()) {
            return None;
        }

        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let severity = collector
            .fields
            .remove(SEVERITY_FIELD)
            .and_then(|s| Severity::from_str(&s).ok())
            .unwrap_or_else(|| severity_for(*metadata.level()));
        if !self.levels.contains(&severity) {
            return None;
        }

        let (cause, chain) = collector.cause();
        if self.policy.ignores_cause(&cause) {
            return self.ignored();
        }

        let mut record: Record = collector.fields.clone().into();
        if let Some(chain) = chain {
            record.insert("error", chain.root_cause.as_str());
            record.insert("error.chain", chain.chain.as_str());
        }
        record.insert("level", severity.as_str());
        record.insert("message", collector.message.clone().unwrap_or_default());
        record.insert("target", metadata.target());
        record.insert("environment", self.environment.as_str());
        record.insert_if_absent(
            "time",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        );

        if self.policy.ignores_record(&cause, &record) {
            return self.ignored();
        }

        Some(record)
    }

    fn ignored(&self) -> Option<Record> {
        self.stats.ignored.fetch_add(1, Ordering::Relaxed);
        record_event_ignored();
        None
    }

    fn report(&self, record: Record) {
        let severity = record.get("level").unwrap_or_default().to_string();
        match self.transport.send(record) {
            Ok(()) => {
                self.stats.reported.fetch_add(1, Ordering::Relaxed);
                record_event_reported(&severity);
            }
            // 热路径上不阻塞、不重试；transport 已计数
            Err(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl<S: Subscriber> Layer<S> for ReportLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if let Some(record) = self.build_record(event) {
            self.report(record);
        }
    }
}

/// Severity for a tracing level; `critical` only comes from an explicit field
pub(crate) fn severity_for(level: Level) -> Severity {
    match level {
        Level::ERROR => Severity::Error,
        Level::WARN => Severity::Warning,
        Level::INFO => Severity::Info,
        Level::DEBUG | Level::TRACE => Severity::Debug,
    }
}

fn is_self_target(target: &str) -> bool {
    SELF_TARGETS.iter().any(|prefix| {
        target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CollectSink;
    use std::fmt;
    use tracing_subscriber::prelude::*;

    #[derive(Debug)]
    struct Wrapped(std::io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fetch config")
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    /// Run `f` with the layer installed, then drain the transport
    async fn capture(layer: ReportLayer, f: impl FnOnce()) {
        let transport = layer.transport.clone();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);
        transport.close().await.unwrap();
    }

    fn layer(sink: &CollectSink) -> ReportLayer {
        ReportLayer::new(BufferedTransport::spawn(sink.clone(), 64), "testing")
    }

    #[tokio::test]
    async fn test_reports_errors_with_standard_keys() {
        let sink = CollectSink::default();
        capture(layer(&sink), || {
            tracing::error!(target: "app", user = "alice", attempt = 3, "payment failed");
        })
        .await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.get("level"), Some("error"));
        assert_eq!(record.get("message"), Some("payment failed"));
        assert_eq!(record.get("environment"), Some("testing"));
        assert_eq!(record.get("user"), Some("alice"));
        assert_eq!(record.get("attempt"), Some("3"));
        assert!(record.get("target").is_some());
        assert!(record.get("time").is_some());
    }

    #[tokio::test]
    async fn test_levels_filter_events() {
        let sink = CollectSink::default();
        let layer = layer(&sink).with_levels(vec![Severity::Warning]);
        capture(layer, || {
            tracing::info!(target: "app", "not reported");
            tracing::error!(target: "app", "not reported either");
            tracing::warn!(target: "app", "reported");
        })
        .await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("level"), Some("warning"));
    }

    #[tokio::test]
    async fn test_severity_field_overrides_level() {
        let sink = CollectSink::default();
        capture(layer(&sink), || {
            tracing::error!(target: "app", severity = "critical", "database gone");
        })
        .await;

        let records = sink.records();
        assert_eq!(records[0].get("level"), Some("critical"));
        assert!(!records[0].contains_key("severity"));
    }

    #[tokio::test]
    async fn test_error_chain_and_ignored_root_cause() {
        let sink = CollectSink::default();
        let policy = IgnorePolicy::new().with_ignored_errors(["connection reset"]);
        let layer = layer(&sink).with_policy(policy);
        let stats = layer.stats();

        capture(layer, || {
            let refused = Wrapped(std::io::Error::other("connection refused"));
            tracing::error!(target: "app", error = &refused as &dyn std::error::Error, "startup");

            let reset = Wrapped(std::io::Error::other("connection reset"));
            tracing::error!(target: "app", err = &reset as &dyn std::error::Error, "request");
        })
        .await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("error"), Some("connection refused"));
        assert_eq!(
            records[0].get("error.chain"),
            Some("fetch config: connection refused")
        );
        assert_eq!(stats.reported(), 1);
        assert_eq!(stats.ignored(), 1);
    }

    #[tokio::test]
    async fn test_message_is_cause_without_error_field() {
        let sink = CollectSink::default();
        let policy = IgnorePolicy::new().with_ignore_error(|cause| cause == "noisy");
        capture(layer(&sink).with_policy(policy), || {
            tracing::error!(target: "app", "noisy");
            tracing::error!(target: "app", "important");
        })
        .await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("message"), Some("important"));
    }

    #[tokio::test]
    async fn test_ignore_sees_assembled_record_and_time_is_kept() {
        let sink = CollectSink::default();
        let policy = IgnorePolicy::new()
            .with_ignore(|_, record| record.get("tenant") == Some("internal"));
        capture(layer(&sink).with_policy(policy), || {
            tracing::error!(target: "app", tenant = "internal", "skip me");
            tracing::error!(target: "app", time = "2020-01-01T00:00:00Z", "keep me");
        })
        .await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("time"), Some("2020-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_transport_events_are_not_reported() {
        let sink = CollectSink::default();
        capture(layer(&sink), || {
            tracing::error!(target: "transport::buffered", "Send failed");
            tracing::error!(target: "report_hook", "internal");
            tracing::error!(target: "transporter", "reported");
        })
        .await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("target"), Some("transporter"));
    }

    #[tokio::test]
    async fn test_closed_transport_drops_without_blocking() {
        let sink = CollectSink::default();
        let layer = layer(&sink);
        let stats = layer.stats();
        layer.transport.close().await.unwrap();

        capture(layer, || tracing::error!(target: "app", "too late")).await;
        assert_eq!(stats.dropped(), 1);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity_for(Level::ERROR), Severity::Error);
        assert_eq!(severity_for(Level::WARN), Severity::Warning);
        assert_eq!(severity_for(Level::INFO), Severity::Info);
        assert_eq!(severity_for(Level::TRACE), Severity::Debug);
    }
}
