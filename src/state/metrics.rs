// Run totals

use crate::state::{FileResult, TestStatus};
use serde::Serialize;

/// Counters accumulated across every file of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTotals {
    pub files: usize,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub retried: usize,
    pub total_duration_ms: u64,
}

impl RunTotals {
    /// Add the results of one file
    pub fn add_file(&mut self, file: &FileResult) {
        self.files += 1;
        for result in &file.test_results {
            self.total += 1;
            self.total_duration_ms += result.duration_ms();
            if result.invocations.is_some_and(|n| n > 1) {
                self.retried += 1;
            }
            match result.status {
                TestStatus::Passed => self.passed += 1,
                TestStatus::Failed => self.failed += 1,
                _ => self.skipped += 1,
            }
        }
    }

    /// Check if all tests passed
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AssertionResult;

    #[test]
    fn test_run_totals_add_file() {
        let mut totals = RunTotals::default();
        totals.add_file(&FileResult::new(
            "a.test.js",
            vec![
                AssertionResult::new(&["A"], "ok", TestStatus::Passed).with_duration(3),
                AssertionResult::new(&["A"], "bad", TestStatus::Failed)
                    .with_duration(4)
                    .with_invocations(3),
                AssertionResult::new(&["A"], "later", TestStatus::Todo),
            ],
        ));

        assert_eq!(totals.files, 1);
        assert_eq!(totals.total, 3);
        assert_eq!(totals.passed, 1);
        assert_eq!(totals.failed, 1);
        assert_eq!(totals.skipped, 1);
        assert_eq!(totals.retried, 1);
        assert_eq!(totals.total_duration_ms, 7);
        assert!(!totals.all_passed());
    }
}
