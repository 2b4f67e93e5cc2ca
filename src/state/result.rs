// Host runner result structures

use crate::state::TestStatus;
use serde::{Deserialize, Serialize};

/// Result of a single test case inside a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    #[serde(default)]
    pub ancestor_titles: Vec<String>,
    pub title: String,
    #[serde(default)]
    pub full_name: String,
    pub status: TestStatus,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub failure_messages: Vec<String>,
    #[serde(default)]
    pub invocations: Option<u32>,
}

impl AssertionResult {
    /// Create a result with the given ancestor chain; `full_name` follows the runner convention
    pub fn new(ancestors: &[&str], title: impl Into<String>, status: TestStatus) -> Self {
        let title = title.into();
        let ancestor_titles: Vec<String> = ancestors.iter().map(|s| s.to_string()).collect();
        let full_name = ancestor_titles
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(title.as_str()))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            ancestor_titles,
            title,
            full_name,
            status,
            duration: None,
            failure_messages: Vec::new(),
            invocations: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    pub fn with_invocations(mut self, invocations: u32) -> Self {
        self.invocations = Some(invocations);
        self
    }

    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure_messages.push(message.into());
        self
    }

    /// Duration in milliseconds, zero when the runner did not measure it
    pub fn duration_ms(&self) -> u64 {
        self.duration.unwrap_or(0)
    }
}

/// Results of one test file, delivered as a single batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    #[serde(default)]
    pub test_file_path: String,
    #[serde(default)]
    pub test_results: Vec<AssertionResult>,
}

impl FileResult {
    pub fn new(test_file_path: impl Into<String>, test_results: Vec<AssertionResult>) -> Self {
        Self {
            test_file_path: test_file_path.into(),
            test_results,
        }
    }

    /// Sum of every duration in the file
    pub fn suite_duration(&self) -> u64 {
        self.test_results
            .iter()
            .fold(0, |total: u64, t| total.saturating_add(t.duration_ms()))
    }

    /// Sum of durations of results not sitting directly under a suite
    pub fn test_duration(&self) -> u64 {
        self.test_results
            .iter()
            .filter(|t| t.ancestor_titles.len() != 1)
            .fold(0, |total: u64, t| total.saturating_add(t.duration_ms()))
    }
}
