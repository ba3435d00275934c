//! Delivery outcome events and the local fallback logger.
//!
//! Every flush produces outcome events instead of errors: the caller of
//! `write` never sees delivery results, and nothing is retried. Outcomes
//! travel over a dedicated channel to [`OutcomeLogger`], which renders
//! them as ordinary schema records and hands them to the fallback sink
//! (the console). The fallback path has no route back into the remote
//! sink, so a failing backend cannot recurse into its own buffer.

use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::severity::Severity;
use crate::schema::{LogRecord, SchemaFormatter};
use crate::sink::Sink;
use std::sync::Arc;

/// Result of delivering (or failing to deliver) buffered records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The store acknowledged a batch; `records` entries were indexed.
    BatchDelivered {
        /// Number of acknowledged records.
        records: usize,
    },
    /// The store rejected one specific record of an otherwise accepted
    /// batch.
    RecordRejected {
        /// Partition the record was addressed to.
        index: String,
        /// Store-reported reason.
        reason: String,
    },
    /// The store answered, but the answer could not be interpreted; the
    /// batch may or may not have been indexed.
    UnknownResult {
        /// What could not be interpreted.
        detail: String,
    },
    /// The batch never reached the store, or the store refused it
    /// outright.
    TransportError {
        /// Transport-level failure description.
        detail: String,
    },
}

impl DeliveryOutcome {
    /// Severity of the fallback record describing this outcome.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            DeliveryOutcome::BatchDelivered { .. } => Severity::Debug,
            DeliveryOutcome::RecordRejected { .. } | DeliveryOutcome::UnknownResult { .. } => {
                Severity::Warn
            }
            DeliveryOutcome::TransportError { .. } => Severity::Error,
        }
    }

    /// Category of the fallback record describing this outcome.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            DeliveryOutcome::BatchDelivered { .. } => "InsertSuccess",
            DeliveryOutcome::RecordRejected { .. } => "InsertError",
            DeliveryOutcome::UnknownResult { .. } => "UnknownResult",
            DeliveryOutcome::TransportError { .. } => "TransportError",
        }
    }

    /// Payload of the fallback record describing this outcome.
    #[must_use]
    pub fn payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        match self {
            DeliveryOutcome::BatchDelivered { records } => {
                payload.insert("message".to_string(), json!("log batch delivered"));
                payload.insert("records".to_string(), json!(records));
            }
            DeliveryOutcome::RecordRejected { index, reason } => {
                payload.insert("message".to_string(), json!("log record rejected by store"));
                payload.insert("index".to_string(), json!(index));
                payload.insert("reason".to_string(), json!(reason));
            }
            DeliveryOutcome::UnknownResult { detail } => {
                payload.insert("message".to_string(), json!("log delivery result unknown"));
                payload.insert("detail".to_string(), json!(detail));
            }
            DeliveryOutcome::TransportError { detail } => {
                payload.insert("message".to_string(), json!("log delivery failed"));
                payload.insert("detail".to_string(), json!(detail));
            }
        }
        payload
    }
}

/// Task that renders delivery outcomes through the fallback sink.
///
/// Runs until every outcome sender is dropped, which happens when the
/// remote sink service exits.
pub struct OutcomeLogger {
    rx: mpsc::UnboundedReceiver<DeliveryOutcome>,
    fallback: Arc<dyn Sink>,
    formatter: SchemaFormatter,
}

impl OutcomeLogger {
    #[must_use]
    pub fn new(
        rx: mpsc::UnboundedReceiver<DeliveryOutcome>,
        fallback: Arc<dyn Sink>,
        formatter: SchemaFormatter,
    ) -> Self {
        OutcomeLogger {
            rx,
            fallback,
            formatter,
        }
    }

    /// Consumes outcomes until the channel closes.
    pub async fn run(mut self) {
        while let Some(outcome) = self.rx.recv().await {
            let severity = outcome.severity();
            let record = LogRecord::new(severity, outcome.category(), outcome.payload());
            if self.fallback.accepts(severity) {
                self.fallback.write(&self.formatter.format(&record));
            }
        }
        debug!("Delivery outcome channel closed, outcome logger stopping");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::FormattedRecord;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CaptureSink {
        records: Mutex<Vec<FormattedRecord>>,
    }

    impl Sink for CaptureSink {
        fn name(&self) -> &'static str {
            "capture"
        }

        fn min_severity(&self) -> Severity {
            Severity::Debug
        }

        fn write(&self, record: &FormattedRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    #[test]
    fn test_outcome_severities() {
        assert_eq!(
            DeliveryOutcome::BatchDelivered { records: 3 }.severity(),
            Severity::Debug
        );
        assert_eq!(
            DeliveryOutcome::RecordRejected {
                index: "logstash-2024.03.05".to_string(),
                reason: "mapper_parsing_exception".to_string(),
            }
            .severity(),
            Severity::Warn
        );
        assert_eq!(
            DeliveryOutcome::UnknownResult {
                detail: "short body".to_string()
            }
            .severity(),
            Severity::Warn
        );
        assert_eq!(
            DeliveryOutcome::TransportError {
                detail: "connection refused".to_string()
            }
            .severity(),
            Severity::Error
        );
    }

    #[test]
    fn test_outcome_payloads() {
        let payload = DeliveryOutcome::RecordRejected {
            index: "logstash-2024.03.05".to_string(),
            reason: "mapper_parsing_exception".to_string(),
        }
        .payload();
        assert_eq!(payload.get("index").unwrap(), &json!("logstash-2024.03.05"));
        assert_eq!(
            payload.get("reason").unwrap(),
            &json!("mapper_parsing_exception")
        );
    }

    #[tokio::test]
    async fn test_outcomes_render_through_fallback_sink() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(CaptureSink::default());
        let logger = OutcomeLogger::new(rx, sink.clone(), SchemaFormatter::new("app"));
        let task = tokio::spawn(logger.run());

        tx.send(DeliveryOutcome::TransportError {
            detail: "connection refused".to_string(),
        })
        .unwrap();
        drop(tx);
        task.await.unwrap();

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Error);
        assert_eq!(records[0].category(), "TransportError");
        assert_eq!(
            records[0].get("detail").unwrap(),
            &json!("connection refused")
        );
    }

    #[tokio::test]
    async fn test_fallback_threshold_filters_success_events() {
        struct WarnOnly(CaptureSink);
        impl Sink for WarnOnly {
            fn name(&self) -> &'static str {
                "capture"
            }
            fn min_severity(&self) -> Severity {
                Severity::Warn
            }
            fn write(&self, record: &FormattedRecord) {
                self.0.write(record);
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(WarnOnly(CaptureSink::default()));
        let logger = OutcomeLogger::new(rx, sink.clone(), SchemaFormatter::new("app"));
        let task = tokio::spawn(logger.run());

        tx.send(DeliveryOutcome::BatchDelivered { records: 10 }).unwrap();
        drop(tx);
        task.await.unwrap();

        assert!(sink.0.records.lock().unwrap().is_empty());
    }
}
