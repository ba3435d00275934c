//! Pipeline configuration.
//!
//! All configuration is resolved once at startup into an explicit [`Config`]
//! value that is passed by reference (or `Arc`) into the router and sink
//! constructors. Nothing on the hot logging path reads the process
//! environment.
//!
//! Parsing is lenient throughout: an invalid value is reported through
//! `tracing` and replaced by its default, so a misconfigured process still
//! starts and still logs.
//!
//! # Environment variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `LOGSHIP_APP_NAME` | `logship` |
//! | `LOGSHIP_ENV` | `development` |
//! | `LOGSHIP_LOG_LEVEL` | per-environment threshold |
//! | `LOGSHIP_CONSOLE_PRETTY` | `true` in development |
//! | `LOGSHIP_ELASTIC_URL` | unset (remote sink disabled) |
//! | `LOGSHIP_FLUSH_INTERVAL_MS` | `2000` |
//! | `LOGSHIP_FLUSH_MAX_BYTES` | `1048576` |
//! | `LOGSHIP_FLUSH_TIMEOUT` | `5` (seconds) |
//! | `LOGSHIP_CLIENT_HEADER` | `x-client-id` |

pub mod environment;
pub mod severity;

use std::env;

use tracing::warn;

use crate::config::environment::DeployEnv;
use crate::config::severity::Severity;

/// Default time-trigger for the remote batching sink, in milliseconds.
pub(crate) const DEFAULT_FLUSH_INTERVAL_MS: u64 = 2000;

/// Default size-trigger for the remote batching sink, in bytes.
pub(crate) const DEFAULT_FLUSH_MAX_BYTES: usize = 1024 * 1024;

/// Default timeout for one bulk request, in seconds.
pub(crate) const DEFAULT_FLUSH_TIMEOUT: u64 = 5;

/// Process-wide logging configuration, fixed at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Application identity merged into every record's envelope.
    pub app_name: String,
    /// Deployment environment, selects thresholds and enabled sinks.
    pub environment: DeployEnv,
    /// Router-level minimum severity. Records below it are dropped before
    /// formatting.
    pub min_severity: Severity,
    /// Console sink threshold. Defaults to `min_severity`.
    pub console_min_severity: Severity,
    /// Colorized multi-line console output instead of one JSON line per
    /// record. Selected once at startup, not per call.
    pub console_pretty: bool,
    /// Remote index store base URL. The remote sink is constructed only
    /// when this is set and the environment is production-like.
    pub elastic_url: Option<String>,
    /// Remote sink threshold. Debug records are never shipped remotely.
    pub remote_min_severity: Severity,
    /// Time-trigger for remote flushes, in milliseconds.
    pub flush_interval_ms: u64,
    /// Size-trigger for remote flushes: buffered bytes at or above this
    /// flush immediately.
    pub flush_max_bytes: usize,
    /// Timeout for one bulk request to the remote store, in seconds.
    pub flush_timeout: u64,
    /// Request header identifying the caller, recorded by the request
    /// boundary.
    pub client_header: String,
}

impl Default for Config {
    fn default() -> Self {
        let environment = DeployEnv::default();
        let min_severity = environment.threshold();
        Config {
            app_name: "logship".to_string(),
            console_min_severity: min_severity,
            console_pretty: environment == DeployEnv::Development,
            environment,
            min_severity,
            elastic_url: None,
            remote_min_severity: Severity::Info,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            flush_max_bytes: DEFAULT_FLUSH_MAX_BYTES,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            client_header: "x-client-id".to_string(),
        }
    }
}

impl Config {
    /// Builds the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// `from_env` is this with `std::env::var`; tests supply a map.
    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment: DeployEnv = lookup("LOGSHIP_ENV")
            .map(|val| val.parse().unwrap_or_default())
            .unwrap_or_default();

        let min_severity: Severity = match lookup("LOGSHIP_LOG_LEVEL") {
            Some(val) => val.parse().unwrap_or_else(|e: String| {
                warn!("{e}, using the {} threshold", environment.as_str());
                environment.threshold()
            }),
            None => environment.threshold(),
        };

        let console_pretty = lookup("LOGSHIP_CONSOLE_PRETTY")
            .map(|val| val.to_lowercase() != "false" && val != "0")
            .unwrap_or(environment == DeployEnv::Development);

        let flush_interval_ms = parse_number(
            lookup("LOGSHIP_FLUSH_INTERVAL_MS"),
            "LOGSHIP_FLUSH_INTERVAL_MS",
            DEFAULT_FLUSH_INTERVAL_MS,
        );
        // A zero interval would spin the flush timer; treat it as unset.
        let flush_interval_ms = if flush_interval_ms == 0 {
            warn!("LOGSHIP_FLUSH_INTERVAL_MS is 0, using default");
            DEFAULT_FLUSH_INTERVAL_MS
        } else {
            flush_interval_ms
        };

        let flush_max_bytes = parse_number(
            lookup("LOGSHIP_FLUSH_MAX_BYTES"),
            "LOGSHIP_FLUSH_MAX_BYTES",
            DEFAULT_FLUSH_MAX_BYTES,
        );

        let flush_timeout = parse_number(
            lookup("LOGSHIP_FLUSH_TIMEOUT"),
            "LOGSHIP_FLUSH_TIMEOUT",
            DEFAULT_FLUSH_TIMEOUT,
        );

        let elastic_url = lookup("LOGSHIP_ELASTIC_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Config {
            app_name: lookup("LOGSHIP_APP_NAME").unwrap_or_else(|| "logship".to_string()),
            console_min_severity: min_severity,
            console_pretty,
            environment,
            min_severity,
            elastic_url,
            remote_min_severity: Severity::Info,
            flush_interval_ms,
            flush_max_bytes,
            flush_timeout,
            client_header: lookup("LOGSHIP_CLIENT_HEADER")
                .unwrap_or_else(|| "x-client-id".to_string()),
        }
    }

    /// Base URL of the remote store, when the remote sink should exist in
    /// this environment.
    #[must_use]
    pub fn remote_endpoint(&self) -> Option<&str> {
        if self.environment.is_production_like() {
            self.elastic_url.as_deref()
        } else {
            None
        }
    }
}

fn parse_number<T>(value: Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match value {
        Some(raw) => match raw.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Invalid value '{raw}' for {key}, using default");
                default
            }
        },
        None => default,
    }
}
