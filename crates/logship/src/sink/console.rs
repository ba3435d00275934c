//! Console sink: formatted records on standard output.
//!
//! Two renderings, chosen once at construction and never per call:
//!
//! - **pretty**: colorized, multi-line, for interactive development. The
//!   `timestamp` and `app` envelope fields are hidden; a developer watching
//!   a terminal knows both already.
//! - **raw**: one compact JSON object per line, for collectors that tail
//!   the process output.
//!
//! Output goes to standard output only, never standard error. A failed
//! stdout write is reported through `tracing` and otherwise dropped;
//! console delivery has no other fallback.

use std::io::{self, Write};

use tracing::error;

use crate::config::severity::Severity;
use crate::config::Config;
use crate::schema::FormattedRecord;
use crate::sink::Sink;

/// Rendering mode, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// Colorized human-readable text.
    Pretty,
    /// Single-line machine-readable JSON.
    Raw,
}

/// Envelope fields hidden from pretty output.
const PRETTY_HIDDEN_FIELDS: [&str; 2] = ["timestamp", "app"];

/// Sink writing every record to standard output.
#[derive(Clone, Debug)]
pub struct ConsoleSink {
    mode: RenderMode,
    min_severity: Severity,
}

impl ConsoleSink {
    #[must_use]
    pub fn new(mode: RenderMode, min_severity: Severity) -> Self {
        ConsoleSink { mode, min_severity }
    }

    /// Builds the sink the way the given configuration asks for it.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mode = if config.console_pretty {
            RenderMode::Pretty
        } else {
            RenderMode::Raw
        };
        ConsoleSink::new(mode, config.console_min_severity)
    }

    fn render(&self, record: &FormattedRecord) -> String {
        match self.mode {
            RenderMode::Pretty => render_pretty(record),
            RenderMode::Raw => record.to_line(),
        }
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn min_severity(&self) -> Severity {
        self.min_severity
    }

    fn write(&self, record: &FormattedRecord) {
        let line = self.render(record);
        let mut out = io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}") {
            error!("Failed to write log record to stdout: {e}");
        }
    }
}

fn color(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug => "\x1b[2m",  // dim
        Severity::Info => "\x1b[32m",  // green
        Severity::Warn => "\x1b[33m",  // yellow
        Severity::Error => "\x1b[31m", // red
    }
}

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Multi-line colorized rendering.
///
/// First line: colored severity label and the category. Following lines:
/// every visible field, indented, one per line.
fn render_pretty(record: &FormattedRecord) -> String {
    let mut text = format!(
        "{}{}{:>5}{} {}{}{}",
        BOLD,
        color(record.severity),
        record.severity.as_ref(),
        RESET,
        BOLD,
        record.category(),
        RESET,
    );
    for (key, value) in record.fields() {
        if PRETTY_HIDDEN_FIELDS.contains(&key.as_str()) || key == "severity" || key == "category" {
            continue;
        }
        let rendered = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        text.push_str(&format!("\n    {key}: {rendered}"));
    }
    text
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::{LogRecord, SchemaFormatter};
    use serde_json::{json, Map, Value};

    fn formatted(severity: Severity) -> FormattedRecord {
        let mut payload = Map::new();
        payload.insert("status".to_string(), json!(503));
        payload.insert("url".to_string(), json!("/health"));
        let record =
            LogRecord::with_timestamp_str("2024-03-05T10:00:00Z", severity, "ResponseError", payload);
        SchemaFormatter::new("orders-api").format(&record)
    }

    #[test]
    fn test_raw_mode_renders_one_json_line() {
        let sink = ConsoleSink::new(RenderMode::Raw, Severity::Debug);
        let line = sink.render(&formatted(Severity::Error));

        assert!(!line.contains('\n'));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["app"], "orders-api");
        assert_eq!(parsed["severity"], "error");
        assert_eq!(parsed["status"], 503);
        assert_eq!(parsed["timestamp"], "2024-03-05T10:00:00.000Z");
    }

    #[test]
    fn test_pretty_mode_hides_timestamp_and_app() {
        let sink = ConsoleSink::new(RenderMode::Pretty, Severity::Debug);
        let text = sink.render(&formatted(Severity::Error));

        assert!(text.contains("ERROR"));
        assert!(text.contains("ResponseError"));
        assert!(text.contains("status: 503"));
        assert!(text.contains("url: /health"));
        assert!(!text.contains("orders-api"));
        assert!(!text.contains("2024-03-05"));
    }

    #[test]
    fn test_pretty_mode_colors_by_severity() {
        let sink = ConsoleSink::new(RenderMode::Pretty, Severity::Debug);
        assert!(sink.render(&formatted(Severity::Error)).contains("\x1b[31m"));
        assert!(sink.render(&formatted(Severity::Warn)).contains("\x1b[33m"));
    }

    #[test]
    fn test_mode_selected_from_config() {
        let config = Config::default();
        assert_eq!(ConsoleSink::from_config(&config).mode, RenderMode::Pretty);

        let config = Config {
            console_pretty: false,
            ..Config::default()
        };
        assert_eq!(ConsoleSink::from_config(&config).mode, RenderMode::Raw);
    }

    #[test]
    fn test_threshold_comes_from_config() {
        let config = Config {
            console_min_severity: Severity::Warn,
            ..Config::default()
        };
        let sink = ConsoleSink::from_config(&config);
        assert!(sink.accepts(Severity::Warn));
        assert!(sink.accepts(Severity::Error));
        assert!(!sink.accepts(Severity::Info));
    }
}
