//! Log severity levels and their total order.
//!
//! Severity drives every routing decision in the pipeline: the router's
//! global gate, each sink's own threshold, and the request boundary's
//! outcome classification all compare against this order:
//!
//! ```text
//! Debug < Info < Warn < Error
//! ```
//!
//! Parsing from strings is case-insensitive. Unrecognized values are an
//! error at the parse site; configuration falls back to defaults there
//! rather than failing startup.

use std::fmt;
use std::str::FromStr;

/// Record severity, ordered from least to most severe.
///
/// The variant order defines the derived `Ord`: a record is admitted by a
/// threshold when `severity >= threshold`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    /// Diagnostic detail, normally visible only in development.
    Debug,
    /// Normal operational events. This is the default threshold.
    #[default]
    Info,
    /// Degraded but recoverable conditions (e.g. client errors).
    Warn,
    /// Failures that need operator attention.
    Error,
}

impl Severity {
    /// Lowercase name as written into the common schema (`"warn"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

/// Uppercase label for human-readable console output (`"WARN"`).
impl AsRef<str> for Severity {
    fn as_ref(&self) -> &str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            _ => Err(format!(
                "Invalid severity: '{s}'. Valid severities are: debug, info, warn, error",
            )),
        }
    }
}
