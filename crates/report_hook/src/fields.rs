//! Event field extraction
//!
//! Every field becomes a string. The well-known error fields (`error`, then
//! `err`) additionally yield the root cause used by the ignore policy.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use tracing::field::{Field, Visit};

/// Fields checked for an error, in priority order
pub(crate) const ERROR_FIELDS: [&str; 2] = ["error", "err"];

/// Field that overrides the severity derived from the event level
pub(crate) const SEVERITY_FIELD: &str = "severity";

/// Error recorded through `record_error`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ErrorChain {
    /// Message of the innermost `source()`
    pub root_cause: String,
    /// Outer-to-inner messages joined with ": "
    pub chain: String,
}

impl ErrorChain {
    pub(crate) fn from_error(error: &(dyn Error + 'static)) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error;
        while let Some(source) = current.source() {
            messages.push(source.to_string());
            current = source;
        }

        Self {
            root_cause: current.to_string(),
            chain: messages.join(": "),
        }
    }
}

/// Visitor collecting an event's fields as strings
#[derive(Debug, Default)]
pub(crate) struct FieldCollector {
    pub fields: BTreeMap<String, String>,
    pub message: Option<String>,
    /// Keyed by field name; only filled for fields recorded as `dyn Error`
    pub errors: BTreeMap<&'static str, ErrorChain>,
}

impl FieldCollector {
    /// Cause of the event: the first well-known error field, else the message
    ///
    /// Returns the root-cause message and, for real error values, the full chain.
    pub fn cause(&self) -> (String, Option<&ErrorChain>) {
        for name in ERROR_FIELDS {
            if let Some(chain) = self.errors.get(name) {
                return (chain.root_cause.clone(), Some(chain));
            }
            if let Some(value) = self.fields.get(name) {
                return (value.clone(), None);
            }
        }
        (self.message.clone().unwrap_or_default(), None)
    }

    fn insert(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        if let Some(name) = ERROR_FIELDS.into_iter().find(|n| *n == field.name()) {
            self.errors.insert(name, ErrorChain::from_error(value));
        }
        self.insert(field, value.to_string());
    }
}
