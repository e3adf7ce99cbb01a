//! Panic reporting

use std::any::Any;
use std::panic::{self, Location};

use chrono::{SecondsFormat, Utc};

use contracts::{Record, Severity};
use transport::BufferedTransport;

/// Report every panic as a critical record, then run the previous hook
///
/// The record is only enqueued; callers that exit right after a panic should
/// close the transport (e.g. via [`ReportGuard`](crate::ReportGuard)) to
/// flush it. If the record cannot be enqueued, a line is written to stderr.
/// The hook never blocks on the transport, so a panic raised from inside
/// `send` itself is still reported on stderr.
pub fn install_panic_hook(transport: BufferedTransport, environment: impl Into<String>) {
    let environment = environment.into();
    let previous = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let record = panic_record(info.payload(), info.location(), &environment);
        if let Err(e) = transport.try_send(record) {
            eprintln!("reporting_panic=false err={:?}", e.to_string());
        }
        previous(info);
    }));
}

pub(crate) fn panic_record(
    payload: &(dyn Any + Send),
    location: Option<&Location<'_>>,
    environment: &str,
) -> Record {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Box<dyn Any>".to_string());

    let mut record = Record::new()
        .with("level", Severity::Critical.as_str())
        .with("message", format!("panic: {message}"))
        .with("error", message)
        .with("environment", environment)
        .with("time", Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));

    if let Some(location) = location {
        record.insert(
            "location",
            format!("{}:{}:{}", location.file(), location.line(), location.column()),
        );
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CollectSink;

    #[test]
    fn test_panic_record_from_str_payload() {
        let payload: Box<dyn Any + Send> = Box::new("index out of bounds");
        let record = panic_record(payload.as_ref(), Some(Location::caller()), "prod");

        assert_eq!(record.get("level"), Some("critical"));
        assert_eq!(record.get("message"), Some("panic: index out of bounds"));
        assert_eq!(record.get("environment"), Some("prod"));
        assert!(record.get("location").unwrap().contains("panic.rs"));
    }

    #[test]
    fn test_panic_record_from_string_payload() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("bad state: 3"));
        let record = panic_record(payload.as_ref(), None, "prod");
        assert_eq!(record.get("error"), Some("bad state: 3"));
        assert!(!record.contains_key("location"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_installed_hook_reports_panics() {
        let sink = CollectSink::default();
        let transport = BufferedTransport::spawn(sink.clone(), 8);
        install_panic_hook(transport.clone(), "testing");

        let result = std::thread::spawn(|| panic!("worker exploded")).join();
        // Restore the default hook for the remaining tests.
        let _ = panic::take_hook();
        assert!(result.is_err());

        transport.close().await.unwrap();
        let records = sink.records();
        assert!(records
            .iter()
            .any(|r| r.get("message") == Some("panic: worker exploded")));
    }
}
