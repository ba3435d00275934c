//! Common log schema and the formatter that produces it.
//!
//! Every record, whatever its destination, is rendered into the same flat
//! JSON object: a fixed envelope plus the caller's payload. Downstream
//! index tooling queries by the envelope field names, so they are stable:
//!
//! | Field | Content |
//! |-------|---------|
//! | `timestamp` | RFC 3339, millisecond precision, UTC |
//! | `severity`  | lowercase severity name |
//! | `app`       | application identity from configuration |
//! | `category`  | caller-supplied tag, e.g. `ResponseError` |
//!
//! Payload keys are merged in unchanged. On a name collision the envelope
//! always wins: a payload `"app"` cannot spoof the application identity.
//!
//! Formatting is pure and performs no I/O. The one recoverable input
//! problem, a malformed timestamp string, falls back to the current time;
//! logging must never become a new source of request failure.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::severity::Severity;

/// Envelope field names, in rendering order.
pub const ENVELOPE_FIELDS: [&str; 4] = ["timestamp", "severity", "app", "category"];

/// A structured record as handed to the router, before schema formatting.
///
/// Immutable once constructed; one is created per log call and discarded
/// after delivery to all sinks.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Routing severity.
    pub severity: Severity,
    /// Caller-supplied tag grouping related records.
    pub category: String,
    /// Freeform structured payload.
    pub payload: Map<String, Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(severity: Severity, category: impl Into<String>, payload: Map<String, Value>) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            severity,
            category: category.into(),
            payload,
        }
    }

    /// Creates a record from a caller-supplied RFC 3339 timestamp.
    ///
    /// A timestamp that fails to parse falls back to the current time.
    #[must_use]
    pub fn with_timestamp_str(
        timestamp: &str,
        severity: Severity,
        category: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        let timestamp = match DateTime::parse_from_rfc3339(timestamp) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(e) => {
                debug!("Malformed record timestamp '{timestamp}': {e}, using current time");
                Utc::now()
            }
        };
        LogRecord {
            timestamp,
            severity,
            category: category.into(),
            payload,
        }
    }
}

/// A record rendered into the common schema, ready for any sink.
#[derive(Clone, Debug, PartialEq)]
pub struct FormattedRecord {
    /// Severity, kept typed for per-sink threshold checks.
    pub severity: Severity,
    /// Timestamp, kept typed for partition-key derivation.
    pub timestamp: DateTime<Utc>,
    fields: Map<String, Value>,
}

impl FormattedRecord {
    /// Looks up a field by name (envelope or payload).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The record's category tag.
    #[must_use]
    pub fn category(&self) -> &str {
        self.fields
            .get("category")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// All schema fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Renders the record as one compact JSON line.
    #[must_use]
    pub fn to_line(&self) -> String {
        // Map<String, Value> serialization cannot fail.
        serde_json::to_string(&self.fields).unwrap_or_default()
    }
}

/// Transforms raw records into the common schema.
///
/// Holds the process-wide context merged into every record. Construct one
/// per pipeline, at startup.
#[derive(Clone, Debug)]
pub struct SchemaFormatter {
    app_name: String,
}

impl SchemaFormatter {
    #[must_use]
    pub fn new(app_name: impl Into<String>) -> Self {
        SchemaFormatter {
            app_name: app_name.into(),
        }
    }

    /// Renders a record into the common schema.
    ///
    /// Payload keys are copied first, then the envelope is written over
    /// them, so envelope fields win every collision.
    #[must_use]
    pub fn format(&self, record: &LogRecord) -> FormattedRecord {
        let mut fields = record.payload.clone();
        fields.insert(
            "timestamp".to_string(),
            Value::String(
                record
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        );
        fields.insert(
            "severity".to_string(),
            Value::String(record.severity.as_str().to_string()),
        );
        fields.insert("app".to_string(), Value::String(self.app_name.clone()));
        fields.insert(
            "category".to_string(),
            Value::String(record.category.clone()),
        );
        FormattedRecord {
            severity: record.severity,
            timestamp: record.timestamp,
            fields,
        }
    }
}
