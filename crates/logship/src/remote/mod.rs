//! Remote batching sink: buffered bulk delivery to the log index store.
//!
//! # Architecture
//!
//! ```text
//!    Router (any request task)
//!         │  RemoteSinkHandle::write  (channel send, non-blocking)
//!         v
//!   ┌──────────────┐
//!   │ Service task │  owns the aggregator; flushes on byte threshold
//!   │  (actor)     │  or interval tick, whichever first
//!   └──────┬───────┘
//!          │  NDJSON bulk bodies
//!          v
//!   ┌──────────────┐
//!   │   Flusher    │  POST {base}/_bulk, classify the result
//!   └──────┬───────┘
//!          │  DeliveryOutcome events
//!          v
//!   ┌──────────────┐
//!   │OutcomeLogger │  renders outcomes through the console sink only
//!   └──────────────┘
//! ```
//!
//! Enqueueing never blocks on the network: only the service task performs
//! remote calls, and producers communicate with it over an unbounded
//! channel. Delivery outcomes are events, not errors; they flow to a local
//! fallback log that structurally bypasses this sink, so a failing backend
//! cannot feed records back into its own buffer.
//!
//! Delivery is at most once: a failed batch is reported and dropped, never
//! requeued.

pub mod aggregator;
pub mod flusher;
pub mod outcome;
pub mod service;
