//! Actor task owning the remote sink's buffer and flush cycle.
//!
//! The service is the single owner of the [`Aggregator`]; producers talk
//! to it through cloneable [`RemoteSinkHandle`]s over an unbounded
//! channel, so no lock is ever held across the network call and enqueues
//! stay fast while a flush is in flight.
//!
//! A flush happens when EITHER the buffered byte size crosses the
//! configured threshold OR the flush interval elapses, whichever comes
//! first, and once more during shutdown so a cancelled process drains its
//! buffer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::severity::Severity;
use crate::config::Config;
use crate::remote::aggregator::{
    partition_key, Aggregator, PartitionFn, MAX_BATCH_BYTES, MAX_BATCH_ENTRIES,
};
use crate::remote::flusher::Flusher;
use crate::remote::outcome::DeliveryOutcome;
use crate::schema::FormattedRecord;
use crate::sink::Sink;

/// Remote sink construction parameters, fixed at sink creation.
#[derive(Debug)]
pub struct RemoteSinkParams {
    /// Base URL of the store.
    pub endpoint: String,
    /// Sink threshold.
    pub min_severity: Severity,
    /// Time-based flush trigger.
    pub flush_interval: Duration,
    /// Size-based flush trigger, in buffered bytes.
    pub flush_max_bytes: usize,
    /// Timeout for one bulk request, in seconds.
    pub flush_timeout_secs: u64,
    /// Partition naming function applied per record.
    pub partition: PartitionFn,
    /// Token cancelling the service (final flush included).
    pub cancel: CancellationToken,
}

impl RemoteSinkParams {
    /// Derives sink parameters from the process configuration.
    #[must_use]
    pub fn from_config(
        config: &Config,
        endpoint: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        RemoteSinkParams {
            endpoint: endpoint.into(),
            min_severity: config.remote_min_severity,
            flush_interval: Duration::from_millis(config.flush_interval_ms),
            flush_max_bytes: config.flush_max_bytes,
            flush_timeout_secs: config.flush_timeout,
            partition: partition_key,
            cancel,
        }
    }
}

#[derive(Debug)]
enum Command {
    Enqueue(Box<FormattedRecord>),
    Flush,
}

/// What woke the service loop up.
enum Wake {
    Cancelled,
    Tick,
    Command(Option<Command>),
}

/// Cloneable producer side of the remote sink.
///
/// This is what the router fans out to; `write` is a channel send and
/// never blocks on the network.
#[derive(Clone, Debug)]
pub struct RemoteSinkHandle {
    tx: mpsc::UnboundedSender<Command>,
    min_severity: Severity,
}

impl RemoteSinkHandle {
    /// Asks the service to flush ahead of its triggers. Returns false when
    /// the service is gone.
    #[must_use]
    pub fn request_flush(&self) -> bool {
        self.tx.send(Command::Flush).is_ok()
    }
}

impl Sink for RemoteSinkHandle {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn min_severity(&self) -> Severity {
        self.min_severity
    }

    fn write(&self, record: &FormattedRecord) {
        if self
            .tx
            .send(Command::Enqueue(Box::new(record.clone())))
            .is_err()
        {
            warn!("Remote sink is shut down, dropping record");
        }
    }
}

/// The service task. Spawn [`RemoteSinkService::run`] once per sink.
pub struct RemoteSinkService {
    aggregator: Aggregator,
    flusher: Flusher,
    rx: mpsc::UnboundedReceiver<Command>,
    outcome_tx: mpsc::UnboundedSender<DeliveryOutcome>,
    flush_interval: Duration,
    flush_max_bytes: usize,
    cancel: CancellationToken,
}

impl RemoteSinkService {
    /// Creates the service, its producer handle, and the receiver on which
    /// delivery outcomes are published.
    #[must_use]
    pub fn new(
        params: RemoteSinkParams,
    ) -> (
        Self,
        RemoteSinkHandle,
        mpsc::UnboundedReceiver<DeliveryOutcome>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let service = RemoteSinkService {
            aggregator: Aggregator::new(MAX_BATCH_ENTRIES, MAX_BATCH_BYTES, params.partition),
            flusher: Flusher::new(params.endpoint, params.flush_timeout_secs),
            rx,
            outcome_tx,
            flush_interval: params.flush_interval,
            flush_max_bytes: params.flush_max_bytes,
            cancel: params.cancel,
        };
        let handle = RemoteSinkHandle {
            tx,
            min_severity: params.min_severity,
        };
        (service, handle, outcome_rx)
    }

    /// Runs the flush cycle until cancellation or until every handle is
    /// dropped. Always performs one final flush before returning.
    pub async fn run(mut self) {
        debug!("Remote sink service started");
        let mut ticker = interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick resolves immediately; an empty flush is harmless
        // but pointless.
        ticker.tick().await;

        loop {
            let wake = tokio::select! {
                () = self.cancel.cancelled() => Wake::Cancelled,
                _ = ticker.tick() => Wake::Tick,
                command = self.rx.recv() => Wake::Command(command),
            };
            match wake {
                Wake::Cancelled => {
                    debug!("Remote sink service cancelled, draining buffer");
                    break;
                }
                Wake::Tick => {
                    self.flush_now().await;
                }
                Wake::Command(Some(Command::Enqueue(record))) => {
                    self.aggregator.push(&record);
                    if self.aggregator.buffered_bytes() >= self.flush_max_bytes {
                        self.flush_now().await;
                        ticker.reset();
                    }
                }
                Wake::Command(Some(Command::Flush)) => {
                    self.flush_now().await;
                    ticker.reset();
                }
                Wake::Command(None) => {
                    debug!("All remote sink handles dropped, stopping");
                    break;
                }
            }
        }

        self.drain_pending();
        self.flush_now().await;
        debug!("Remote sink service stopped");
    }

    /// Moves commands already sitting in the channel into the buffer,
    /// without awaiting new ones.
    fn drain_pending(&mut self) {
        while let Ok(command) = self.rx.try_recv() {
            if let Command::Enqueue(record) = command {
                self.aggregator.push(&record);
            }
        }
    }

    async fn flush_now(&mut self) {
        for body in self.aggregator.drain_bodies() {
            for outcome in self.flusher.flush(body).await {
                if self.outcome_tx.send(outcome).is_err() {
                    debug!("Delivery outcome receiver dropped");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::{LogRecord, SchemaFormatter};
    use serde_json::Map;
    use tokio::time::timeout;

    fn test_record() -> FormattedRecord {
        let record = LogRecord::new(Severity::Info, "Test", Map::new());
        SchemaFormatter::new("app").format(&record)
    }

    fn unreachable_params(cancel: CancellationToken) -> RemoteSinkParams {
        RemoteSinkParams {
            // Nothing listens here; flushes must fail fast with a
            // transport outcome.
            endpoint: "http://127.0.0.1:9".to_string(),
            min_severity: Severity::Info,
            flush_interval: Duration::from_secs(600),
            flush_max_bytes: usize::MAX,
            flush_timeout_secs: 1,
            partition: partition_key,
            cancel,
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_yields_transport_outcome() {
        let cancel = CancellationToken::new();
        let (service, handle, mut outcomes) = RemoteSinkService::new(unreachable_params(cancel));
        tokio::spawn(service.run());

        handle.write(&test_record());
        assert!(handle.request_flush());

        let outcome = timeout(Duration::from_secs(10), outcomes.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, DeliveryOutcome::TransportError { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_service() {
        let cancel = CancellationToken::new();
        let (service, handle, _outcomes) =
            RemoteSinkService::new(unreachable_params(cancel.clone()));
        let task = tokio::spawn(service.run());

        cancel.cancel();
        timeout(Duration::from_secs(10), task).await.unwrap().unwrap();

        // Writes after shutdown are dropped, not panics.
        handle.write(&test_record());
        assert!(!handle.request_flush());
    }

    #[tokio::test]
    async fn test_service_stops_when_handles_drop() {
        let cancel = CancellationToken::new();
        let (service, handle, _outcomes) = RemoteSinkService::new(unreachable_params(cancel));
        let task = tokio::spawn(service.run());

        drop(handle);
        timeout(Duration::from_secs(10), task).await.unwrap().unwrap();
    }

    #[test]
    fn test_params_from_config() {
        let config = Config {
            flush_interval_ms: 250,
            flush_max_bytes: 4096,
            flush_timeout: 7,
            ..Config::default()
        };
        let params =
            RemoteSinkParams::from_config(&config, "http://elastic:9200", CancellationToken::new());
        assert_eq!(params.flush_interval, Duration::from_millis(250));
        assert_eq!(params.flush_max_bytes, 4096);
        assert_eq!(params.flush_timeout_secs, 7);
        assert_eq!(params.min_severity, Severity::Info);
    }
}
