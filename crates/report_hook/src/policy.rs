//! Ignore policy - decides which events are never reported

use std::fmt;
use std::sync::Arc;

use contracts::Record;

type CausePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;
type RecordPredicate = Arc<dyn Fn(&str, &Record) -> bool + Send + Sync>;

/// Filters applied to each candidate event, in order:
/// 1. `ignored_errors`: exact match on the root-cause message
/// 2. `ignore_error`: predicate on the root cause
/// 3. `ignore`: predicate on the root cause and the assembled record
#[derive(Clone, Default)]
pub struct IgnorePolicy {
    ignored_errors: Vec<String>,
    ignore_error: Option<CausePredicate>,
    ignore: Option<RecordPredicate>,
}

impl IgnorePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root-cause messages that are never reported
    pub fn with_ignored_errors<I, S>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_errors.extend(errors.into_iter().map(Into::into));
        self
    }

    pub fn with_ignore_error(mut self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.ignore_error = Some(Arc::new(f));
        self
    }

    pub fn with_ignore(
        mut self,
        f: impl Fn(&str, &Record) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.ignore = Some(Arc::new(f));
        self
    }

    /// Checks that only need the cause; run before the record is built
    pub fn ignores_cause(&self, cause: &str) -> bool {
        self.ignored_errors.iter().any(|ignored| ignored == cause)
            || self.ignore_error.as_ref().is_some_and(|f| f(cause))
    }

    /// Final check on the assembled record
    pub fn ignores_record(&self, cause: &str, record: &Record) -> bool {
        self.ignore.as_ref().is_some_and(|f| f(cause, record))
    }
}

impl fmt::Debug for IgnorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnorePolicy")
            .field("ignored_errors", &self.ignored_errors)
            .field("ignore_error", &self.ignore_error.is_some())
            .field("ignore", &self.ignore.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignores_nothing() {
        let policy = IgnorePolicy::new();
        assert!(!policy.ignores_cause("anything"));
        assert!(!policy.ignores_record("anything", &Record::new()));
    }

    #[test]
    fn test_ignored_errors_match_exactly() {
        let policy = IgnorePolicy::new().with_ignored_errors(["context canceled"]);
        assert!(policy.ignores_cause("context canceled"));
        assert!(!policy.ignores_cause("context canceled by peer"));
    }

    #[test]
    fn test_predicates() {
        let policy = IgnorePolicy::new()
            .with_ignore_error(|cause| cause.starts_with("EOF"))
            .with_ignore(|_, record| record.get("user") == Some("healthcheck"));

        assert!(policy.ignores_cause("EOF while reading"));
        assert!(!policy.ignores_cause("timeout"));

        let record = Record::new().with("user", "healthcheck");
        assert!(policy.ignores_record("timeout", &record));
        assert!(!policy.ignores_record("timeout", &Record::new()));
    }
}
