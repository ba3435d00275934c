//! Bulk transport to the remote log index store.
//!
//! One HTTP client is built at sink construction and reused for every
//! flush. A bulk body is POSTed to `{base}/_bulk` as NDJSON; the response
//! is classified into [`DeliveryOutcome`] events. Nothing here raises to
//! the logging caller and nothing is retried: a failed batch is reported
//! and dropped.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::remote::outcome::DeliveryOutcome;

/// Failure of one bulk request, internal to the flusher.
///
/// Never crosses the sink boundary; [`Flusher::flush`] maps each variant
/// to a [`DeliveryOutcome`].
#[derive(Error, Debug)]
pub enum FlushError {
    /// The request never completed.
    #[error("bulk request failed: {0}")]
    Transport(String),
    /// The store answered with a non-success status.
    #[error("bulk request returned status {0}")]
    Status(u16),
    /// The store answered 2xx but the body was not a bulk response.
    #[error("bulk response could not be parsed: {0}")]
    MalformedResponse(String),
}

/// Response shape of the store's bulk endpoint, reduced to what outcome
/// classification needs.
#[derive(Debug, Deserialize)]
pub(crate) struct BulkResponse {
    pub(crate) errors: bool,
    #[serde(default)]
    pub(crate) items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkItem {
    pub(crate) index: Option<BulkItemStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkItemStatus {
    #[serde(rename = "_index", default)]
    pub(crate) index: String,
    #[serde(default)]
    pub(crate) status: u16,
    pub(crate) error: Option<BulkItemError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkItemError {
    #[serde(rename = "type", default)]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) reason: String,
}

/// Sends bulk bodies to one store endpoint.
#[derive(Clone, Debug)]
pub struct Flusher {
    client: reqwest::Client,
    endpoint: String,
}

impl Flusher {
    /// Builds a flusher for `endpoint` with a per-request timeout.
    ///
    /// Falls back to a default client if the configured one cannot be
    /// built, so sink construction cannot fail.
    #[must_use]
    pub fn new(endpoint: String, timeout_secs: u64) -> Self {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to build HTTP client: {e}, using reqwest defaults");
                reqwest::Client::new()
            }
        };
        Flusher {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Delivers one bulk body and reports what happened.
    ///
    /// Always returns at least one outcome; never returns an error.
    pub async fn flush(&self, body: Vec<u8>) -> Vec<DeliveryOutcome> {
        match self.send(body).await {
            Ok(response) => Self::classify(&response),
            Err(FlushError::MalformedResponse(detail)) => {
                vec![DeliveryOutcome::UnknownResult { detail }]
            }
            Err(e) => vec![DeliveryOutcome::TransportError {
                detail: e.to_string(),
            }],
        }
    }

    async fn send(&self, body: Vec<u8>) -> Result<BulkResponse, FlushError> {
        let url = format!("{}/_bulk", self.endpoint);
        debug!("Flushing {} bytes to {url}", body.len());

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| FlushError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FlushError::Status(status.as_u16()));
        }

        response
            .json::<BulkResponse>()
            .await
            .map_err(|e| FlushError::MalformedResponse(e.to_string()))
    }

    /// Maps a parsed bulk response to outcome events: one per rejected
    /// record, plus one delivery event for the accepted remainder.
    pub(crate) fn classify(response: &BulkResponse) -> Vec<DeliveryOutcome> {
        if !response.errors {
            return vec![DeliveryOutcome::BatchDelivered {
                records: response.items.len(),
            }];
        }

        let mut outcomes = Vec::new();
        let mut accepted = 0usize;
        for item in &response.items {
            match &item.index {
                Some(status) if status.error.is_some() || status.status >= 300 => {
                    let reason = match &status.error {
                        Some(error) if !error.reason.is_empty() => {
                            format!("{}: {}", error.kind, error.reason)
                        }
                        Some(error) => error.kind.clone(),
                        None => format!("status {}", status.status),
                    };
                    outcomes.push(DeliveryOutcome::RecordRejected {
                        index: status.index.clone(),
                        reason,
                    });
                }
                Some(_) => accepted += 1,
                None => outcomes.push(DeliveryOutcome::UnknownResult {
                    detail: "bulk item carried no index action result".to_string(),
                }),
            }
        }
        if accepted > 0 {
            outcomes.push(DeliveryOutcome::BatchDelivered { records: accepted });
        }
        outcomes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> BulkResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_classify_clean_batch() {
        let response = parse(
            r#"{"took":5,"errors":false,"items":[
                {"index":{"_index":"logstash-2024.03.05","status":201}},
                {"index":{"_index":"logstash-2024.03.05","status":201}}
            ]}"#,
        );
        assert_eq!(
            Flusher::classify(&response),
            vec![DeliveryOutcome::BatchDelivered { records: 2 }]
        );
    }

    #[test]
    fn test_classify_partial_failure() {
        let response = parse(
            r#"{"took":5,"errors":true,"items":[
                {"index":{"_index":"logstash-2024.03.05","status":201}},
                {"index":{"_index":"logstash-2024.03.05","status":400,
                    "error":{"type":"mapper_parsing_exception","reason":"failed to parse field"}}}
            ]}"#,
        );
        let outcomes = Flusher::classify(&response);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            outcomes[0],
            DeliveryOutcome::RecordRejected {
                index: "logstash-2024.03.05".to_string(),
                reason: "mapper_parsing_exception: failed to parse field".to_string(),
            }
        );
        assert_eq!(outcomes[1], DeliveryOutcome::BatchDelivered { records: 1 });
    }

    #[test]
    fn test_classify_rejection_without_error_body() {
        let response = parse(
            r#"{"errors":true,"items":[
                {"index":{"_index":"logstash-2024.03.05","status":429}}
            ]}"#,
        );
        let outcomes = Flusher::classify(&response);
        assert_eq!(
            outcomes,
            vec![DeliveryOutcome::RecordRejected {
                index: "logstash-2024.03.05".to_string(),
                reason: "status 429".to_string(),
            }]
        );
    }

    #[test]
    fn test_classify_item_without_action() {
        let response = parse(r#"{"errors":true,"items":[{}]}"#);
        let outcomes = Flusher::classify(&response);
        assert!(matches!(outcomes[0], DeliveryOutcome::UnknownResult { .. }));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FlushError::Status(503).to_string(),
            "bulk request returned status 503"
        );
        assert!(FlushError::Transport("connection refused".to_string())
            .to_string()
            .contains("connection refused"));
    }

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let flusher = Flusher::new("http://elastic:9200/".to_string(), 5);
        assert_eq!(flusher.endpoint, "http://elastic:9200");
    }
}
