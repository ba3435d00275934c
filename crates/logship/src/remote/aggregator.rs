//! Batch buffer for the remote sink.
//!
//! Records arrive one at a time, already schema-formatted, and are rendered
//! immediately into their bulk-protocol form: an action line naming the
//! destination partition, then the record source, each newline-terminated.
//! The buffer keeps byte accounting so the size-based flush trigger is a
//! plain integer comparison.
//!
//! # Batching limits
//!
//! A drained bulk body respects two limits, whichever is hit first:
//! entry count per request and uncompressed body bytes. An entry that
//! would overflow the current body is deferred to the next one, except
//! that an entry larger than the whole budget ships alone rather than
//! starve the queue.
//!
//! # Memory bound
//!
//! The queue holds at most [`MAX_QUEUE_ENTRIES`] entries. Beyond that the
//! oldest entries are evicted FIFO with a warning; the sink stays
//! operational under sustained backpressure at the cost of dropping the
//! oldest records.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::schema::FormattedRecord;

/// Maximum entries per drained bulk body.
pub(crate) const MAX_BATCH_ENTRIES: usize = 1000;

/// Maximum bytes per drained bulk body (uncompressed).
pub(crate) const MAX_BATCH_BYTES: usize = 5 * 1024 * 1024;

/// Maximum queued entries before FIFO eviction.
const MAX_QUEUE_ENTRIES: usize = 50_000;

/// Derives a partition name from a record timestamp.
pub type PartitionFn = fn(&DateTime<Utc>) -> String;

/// Default partition naming: the record's UTC calendar date.
///
/// `2024-03-05T10:00:00Z` maps to `logstash-2024.03.05`. The pattern must
/// match exactly for compatibility with existing indices.
#[must_use]
pub fn partition_key(timestamp: &DateTime<Utc>) -> String {
    format!("logstash-{}", timestamp.format("%Y.%m.%d"))
}

/// FIFO buffer of bulk-rendered entries with byte accounting.
#[derive(Debug)]
pub struct Aggregator {
    entries: VecDeque<String>,
    buffered_bytes: usize,
    max_batch_entries: usize,
    max_batch_bytes: usize,
    max_queue_entries: usize,
    partition: PartitionFn,
}

impl Default for Aggregator {
    fn default() -> Self {
        Aggregator::new(MAX_BATCH_ENTRIES, MAX_BATCH_BYTES, partition_key)
    }
}

impl Aggregator {
    #[must_use]
    pub fn new(max_batch_entries: usize, max_batch_bytes: usize, partition: PartitionFn) -> Self {
        Aggregator {
            entries: VecDeque::new(),
            buffered_bytes: 0,
            max_batch_entries,
            max_batch_bytes,
            max_queue_entries: MAX_QUEUE_ENTRIES,
            partition,
        }
    }

    #[cfg(test)]
    fn with_queue_cap(mut self, cap: usize) -> Self {
        self.max_queue_entries = cap;
        self
    }

    /// Renders a record into its bulk pair and appends it to the queue.
    ///
    /// The partition is computed per record, so one batch may span several
    /// partitions when timestamps cross a day boundary. When the queue is
    /// at capacity the oldest entry is evicted first.
    pub fn push(&mut self, record: &FormattedRecord) {
        if self.entries.len() >= self.max_queue_entries {
            if let Some(evicted) = self.entries.pop_front() {
                self.buffered_bytes -= evicted.len();
                warn!(
                    "Remote log queue full ({} entries), dropping oldest record",
                    self.max_queue_entries
                );
            }
        }

        let index = (self.partition)(&record.timestamp);
        let entry = format!(
            "{{\"index\":{{\"_index\":\"{index}\"}}}}\n{}\n",
            record.to_line()
        );
        self.buffered_bytes += entry.len();
        self.entries.push_back(entry);
    }

    /// Bytes currently buffered, across all queued entries.
    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.buffered_bytes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drains one bulk body from the front of the queue.
    ///
    /// Returns an empty vector when the queue is empty. An entry that does
    /// not fit next to already-drained ones is pushed back for the next
    /// body; an entry that alone exceeds the byte budget is returned as its
    /// own body with a warning.
    pub fn next_body(&mut self) -> Vec<u8> {
        let mut body = Vec::new();
        for _ in 0..self.max_batch_entries {
            let Some(entry) = self.entries.pop_front() else {
                break;
            };
            if !body.is_empty() && body.len() + entry.len() > self.max_batch_bytes {
                self.entries.push_front(entry);
                break;
            }
            if entry.len() > self.max_batch_bytes {
                warn!(
                    "Single record of {} bytes exceeds the {} byte batch budget, sending alone",
                    entry.len(),
                    self.max_batch_bytes
                );
            }
            self.buffered_bytes -= entry.len();
            body.extend_from_slice(entry.as_bytes());
            if body.len() >= self.max_batch_bytes {
                break;
            }
        }
        body
    }

    /// Drains the whole queue into bulk bodies.
    pub fn drain_bodies(&mut self) -> Vec<Vec<u8>> {
        let mut bodies = Vec::new();
        loop {
            let body = self.next_body();
            if body.is_empty() {
                break;
            }
            bodies.push(body);
        }
        bodies
    }
}
