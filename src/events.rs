//! Host runner input.
//!
//! Two shapes are accepted: a JSON-lines stream of lifecycle events, one
//! event per line, and the single JSON document written by
//! `jest --json`. Both are replayed through the reporters' hooks in order.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read};
use std::path::Path;
use tracing::{debug, warn};

use crate::report::Reporter;
use crate::state::{AssertionResult, FileResult, RunTotals};

/// One line of the event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStart,
    TestResult(FileResult),
    RunComplete,
}

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    #[default]
    Events,
    JestJson,
}

impl std::str::FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "events" => Ok(Self::Events),
            "jest-json" => Ok(Self::JestJson),
            other => Err(format!(
                "unknown input format: {} (expected events or jest-json)",
                other
            )),
        }
    }
}

/// Parse one non-blank line of the event stream
pub fn parse_event(line: &str) -> Result<RunEvent> {
    Ok(serde_json::from_str(line)?)
}

/// Feed a JSON-lines event stream to the reporters.
///
/// A stream that ends without `run_complete` is completed implicitly, so
/// queued reporting work is never dropped.
pub async fn replay_events(
    reader: impl BufRead,
    reporters: &mut [Box<dyn Reporter>],
) -> Result<RunTotals> {
    let mut totals = RunTotals::default();
    let mut completed = false;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Failed to read line {}", line_no))?;
        if line.trim().is_empty() {
            continue;
        }
        if completed {
            warn!("Ignoring event after run_complete on line {}", line_no);
            continue;
        }

        let event =
            parse_event(&line).with_context(|| format!("Invalid event on line {}", line_no))?;
        match event {
            RunEvent::RunStart => start(reporters),
            RunEvent::TestResult(file) => {
                totals.add_file(&file);
                dispatch(reporters, &file);
            }
            RunEvent::RunComplete => {
                complete(reporters).await;
                completed = true;
            }
        }
    }

    if !completed {
        warn!("Event stream ended without run_complete, completing run");
        complete(reporters).await;
    }
    Ok(totals)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JestReport {
    #[serde(default)]
    test_results: Vec<JestFileResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JestFileResult {
    name: String,
    #[serde(default)]
    assertion_results: Vec<AssertionResult>,
}

/// Parse the document written by `jest --json`
pub fn parse_jest_json(reader: impl Read) -> Result<Vec<FileResult>> {
    let report: JestReport =
        serde_json::from_reader(reader).context("Invalid jest JSON report")?;
    Ok(report
        .test_results
        .into_iter()
        .map(|file| FileResult::new(file.name, file.assertion_results))
        .collect())
}

/// Replay a `jest --json` report as a full run
pub async fn replay_jest_json(
    reader: impl Read,
    reporters: &mut [Box<dyn Reporter>],
) -> Result<RunTotals> {
    let files = parse_jest_json(reader)?;
    if files.is_empty() {
        bail!("Jest report contains no test files");
    }

    let mut totals = RunTotals::default();
    start(reporters);
    for file in &files {
        totals.add_file(file);
        dispatch(reporters, file);
    }
    complete(reporters).await;
    Ok(totals)
}

fn start(reporters: &mut [Box<dyn Reporter>]) {
    debug!("Run started");
    for reporter in reporters.iter_mut() {
        reporter.on_run_start();
    }
}

fn dispatch(reporters: &mut [Box<dyn Reporter>], file: &FileResult) {
    debug!(
        "Results for {} ({} tests)",
        file.test_file_path,
        file.test_results.len()
    );
    let path = Path::new(&file.test_file_path);
    for reporter in reporters.iter_mut() {
        reporter.on_test_result(path, file);
    }
}

async fn complete(reporters: &mut [Box<dyn Reporter>]) {
    for reporter in reporters.iter_mut() {
        reporter.on_run_complete().await;
    }
    debug!("Run complete");
}
