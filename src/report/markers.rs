// Process-level side channel read by CI (GitHub Actions style output markers)

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Output set when any reporting call failed
pub const RP_ERROR: &str = "RP_ERROR";
/// Output carrying the link of the finished launch
pub const RP_LINK: &str = "RP_LINK";

/// `::set-output name=<name>::<value>`
pub fn format_marker(name: &str, value: &str) -> String {
    format!("::set-output name={}::{}", name, value)
}

/// Destination of diagnostic lines and output markers
pub trait MarkerSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Writes to the process stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl MarkerSink for StdoutSink {
    fn emit(&self, line: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }
}

/// Keeps emitted lines in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MarkerSink for MemorySink {
    fn emit(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Log a failed reporting call and raise the error marker
pub fn report_failure(sink: &dyn MarkerSink, error: &dyn fmt::Display) {
    tracing::error!("Reporting call failed: {}", error);
    sink.emit(&error.to_string());
    sink.emit(&format_marker(RP_ERROR, "true"));
}

/// Print the launch link and expose it as a marker
pub fn report_link(sink: &dyn MarkerSink, link: &str) {
    sink.emit(&format!("\nReportPortal Launch Link: {}", link));
    sink.emit(&format_marker(RP_LINK, link));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;

    #[test]
    fn test_format_marker() {
        assert_eq!(
            format_marker(RP_LINK, "http://rp/ui/#demo/launches/all/42"),
            "::set-output name=RP_LINK::http://rp/ui/#demo/launches/all/42"
        );
    }

    #[test]
    fn test_report_failure_emits_error_marker() {
        let sink = MemorySink::new();
        report_failure(&sink, &ClientError::Aborted("boom".to_string()));

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("boom"));
        assert_eq!(lines[1], "::set-output name=RP_ERROR::true");
    }

    #[test]
    fn test_report_link() {
        let sink = MemorySink::new();
        report_link(&sink, "http://rp/launch/1");
        assert_eq!(
            sink.lines(),
            vec![
                "\nReportPortal Launch Link: http://rp/launch/1".to_string(),
                "::set-output name=RP_LINK::http://rp/launch/1".to_string(),
            ]
        );
    }
}
