// State module - host runner results
// Shapes produced by a Jest-style test runner, one file at a time

pub mod metrics;
pub mod result;

pub use metrics::RunTotals;
pub use result::{AssertionResult, FileResult};

use serde::{Deserialize, Serialize};

/// Assertion status as reported by the host runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Pending,
    Skipped,
    Todo,
    Disabled,
    Focused,
    /// Anything the runner invents later is reported as skipped
    #[serde(other)]
    Unknown,
}

impl TestStatus {
    /// Statuses other than passed/failed are finalized as skipped
    pub fn is_skip_like(&self) -> bool {
        !matches!(self, TestStatus::Passed | TestStatus::Failed)
    }
}
