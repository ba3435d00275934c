//! # logship
//!
//! Structured-logging façade for server processes: every record is
//! rendered into one common schema and routed to the sinks the deployment
//! environment asks for: the console always, plus a remote log index store
//! in production-like environments, with per-sink severity thresholds and
//! batched remote delivery.
//!
//! ## Architecture
//!
//! - [`config`]: explicit startup configuration, severity levels, and the
//!   environment-keyed severity policy
//! - [`schema`]: the common record schema and its formatter
//! - [`router`]: severity-gated fan-out over the sink set
//! - [`sink`]: the sink trait and the console sink
//! - [`remote`]: the batching remote sink (buffer, flush cycle, bulk
//!   transport, delivery outcome events)
//! - [`request_log`]: tower middleware emitting exactly one outcome
//!   record per request
//! - [`pipeline`]: process-level wiring and shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use logship::{Config, Pipeline, RequestLogLayer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env();
//!     let pipeline = Pipeline::start(&config);
//!
//!     let app: axum::Router = axum::Router::new()
//!         .route("/health", axum::routing::get(|| async { "ok" }))
//!         .layer(RequestLogLayer::new(pipeline.router(), &config));
//!
//!     // ... serve `app`, then:
//!     pipeline.shutdown().await;
//! }
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![deny(unused_extern_crates)]
#![deny(unreachable_pub)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]

/// Startup configuration, severity levels, and the severity policy.
pub mod config;

/// Process-level wiring of the sink set and background tasks.
pub mod pipeline;

/// Batched delivery to the remote log index store.
pub mod remote;

/// Request boundary middleware.
pub mod request_log;

/// Severity-gated fan-out to the sink set.
pub mod router;

/// The common record schema and its formatter.
pub mod schema;

/// Output destinations for formatted records.
pub mod sink;

pub use config::environment::DeployEnv;
pub use config::severity::Severity;
pub use config::Config;
pub use pipeline::Pipeline;
pub use request_log::RequestLogLayer;
pub use router::Router;
