//! The log router: the façade the rest of the process calls.
//!
//! One router exists per process. A call carries a severity, a category
//! tag, and a structured payload; the router gates on its own minimum
//! severity, stamps and formats the record once, and fans it out to every
//! sink whose threshold admits it. Fan-out is independent per sink: the
//! console writes synchronously to stdout while the remote sink only
//! enqueues, so one destination cannot block or corrupt another.
//!
//! Logging is fire and forget: no return value, and never part of the
//! request's success path.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::severity::Severity;
use crate::config::Config;
use crate::schema::{LogRecord, SchemaFormatter};
use crate::sink::Sink;

/// Severity-gated fan-out over the configured sinks.
pub struct Router {
    min_severity: Severity,
    formatter: SchemaFormatter,
    sinks: Vec<Arc<dyn Sink>>,
}

impl Router {
    /// Builds a router over an already-constructed sink set.
    #[must_use]
    pub fn new(config: &Config, sinks: Vec<Arc<dyn Sink>>) -> Self {
        Router {
            min_severity: config.min_severity,
            formatter: SchemaFormatter::new(config.app_name.clone()),
            sinks,
        }
    }

    /// Routes one record.
    ///
    /// A severity below the router threshold returns without formatting;
    /// otherwise every admitting sink receives exactly one write. Two
    /// identical calls produce two independent records; nothing is
    /// deduplicated.
    pub fn log(&self, severity: Severity, category: &str, payload: Map<String, Value>) {
        if severity < self.min_severity {
            return;
        }
        let record = LogRecord::new(severity, category, payload);
        let formatted = self.formatter.format(&record);
        for sink in &self.sinks {
            if sink.accepts(severity) {
                sink.write(&formatted);
            }
        }
    }

    /// Routes a debug record.
    pub fn debug(&self, category: &str, payload: Map<String, Value>) {
        self.log(Severity::Debug, category, payload);
    }

    /// Routes an info record.
    pub fn info(&self, category: &str, payload: Map<String, Value>) {
        self.log(Severity::Info, category, payload);
    }

    /// Routes a warn record.
    pub fn warn(&self, category: &str, payload: Map<String, Value>) {
        self.log(Severity::Warn, category, payload);
    }

    /// Routes an error record.
    pub fn error(&self, category: &str, payload: Map<String, Value>) {
        self.log(Severity::Error, category, payload);
    }

    /// Router-level threshold, as configured at startup.
    #[must_use]
    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    /// Names of the configured sinks, in fan-out order.
    #[must_use]
    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }
}
