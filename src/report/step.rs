// Step attempts and how each one is finished

use crate::client::{Attachment, FinishTestItemRq, Issue, ItemStatus, LogLevel, SaveLogRq};
use crate::state::{AssertionResult, TestStatus};

/// One reported execution attempt of a test case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepAttempt {
    pub retried: bool,
    /// Zero-based attempt index, used to find the attempt's artifacts
    pub invocation: u32,
}

/// Attempts to report for one result.
///
/// A positive `rerun_index` wins over the runner's invocation count and
/// yields a single retried attempt with that index.
pub fn plan_attempts(result: &AssertionResult, rerun_index: Option<u32>) -> Vec<StepAttempt> {
    if let Some(index) = rerun_index.filter(|n| *n > 0) {
        return vec![StepAttempt {
            retried: true,
            invocation: index,
        }];
    }

    match result.invocations {
        Some(n) if n > 1 => (0..n)
            .map(|invocation| StepAttempt {
                retried: true,
                invocation,
            })
            .collect(),
        _ => vec![StepAttempt {
            retried: false,
            invocation: 0,
        }],
    }
}

/// Finish request for a step with the given outcome
pub fn finish_request(status: TestStatus, retried: bool, skipped_issue: bool) -> FinishTestItemRq {
    if status.is_skip_like() {
        let issue = (!skipped_issue).then(Issue::not_issue);
        return FinishTestItemRq::with_status(ItemStatus::Skipped, retried).with_issue(issue);
    }
    let status = if status == TestStatus::Failed {
        ItemStatus::Failed
    } else {
        ItemStatus::Passed
    };
    FinishTestItemRq::with_status(status, retried)
}

/// Logs sent for a failed step: the first failure message, then one entry per attachment
pub fn failure_logs(
    result: &AssertionResult,
    attachments: Vec<Attachment>,
) -> Vec<(SaveLogRq, Option<Attachment>)> {
    let message = result.failure_messages.first().cloned().unwrap_or_default();
    let mut logs = vec![(SaveLogRq::new(LogLevel::Error, message), None)];

    logs.extend(attachments.into_iter().map(|attachment| {
        let rq = SaveLogRq::new(LogLevel::Debug, format!("Attachment: {}", attachment.name));
        (rq, Some(attachment))
    }));
    logs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(invocations: Option<u32>) -> AssertionResult {
        let result = AssertionResult::new(&["Cart"], "adds item", TestStatus::Passed);
        match invocations {
            Some(n) => result.with_invocations(n),
            None => result,
        }
    }

    #[test]
    fn test_single_attempt_without_invocations() {
        for invocations in [None, Some(0), Some(1)] {
            let attempts = plan_attempts(&result(invocations), None);
            assert_eq!(
                attempts,
                vec![StepAttempt {
                    retried: false,
                    invocation: 0
                }]
            );
        }
    }

    #[test]
    fn test_one_retried_attempt_per_invocation() {
        let attempts = plan_attempts(&result(Some(3)), None);
        assert_eq!(attempts.len(), 3);
        assert!(attempts.iter().all(|a| a.retried));
        let indexes: Vec<_> = attempts.iter().map(|a| a.invocation).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_rerun_index_overrides_invocations() {
        let attempts = plan_attempts(&result(Some(4)), Some(2));
        assert_eq!(
            attempts,
            vec![StepAttempt {
                retried: true,
                invocation: 2
            }]
        );
    }

    #[test]
    fn test_zero_rerun_index_is_ignored() {
        let attempts = plan_attempts(&result(Some(2)), Some(0));
        assert_eq!(attempts.len(), 2);
    }

    #[test]
    fn test_finish_passed_and_failed() {
        let passed = finish_request(TestStatus::Passed, false, false);
        assert_eq!(passed.status, Some(ItemStatus::Passed));
        assert_eq!(passed.retry, Some(false));
        assert_eq!(passed.issue, None);

        let failed = finish_request(TestStatus::Failed, true, false);
        assert_eq!(failed.status, Some(ItemStatus::Failed));
        assert_eq!(failed.retry, Some(true));
        assert_eq!(failed.issue, None);
    }

    #[test]
    fn test_finish_skipped_like_statuses() {
        for status in [TestStatus::Skipped, TestStatus::Pending, TestStatus::Todo] {
            let rq = finish_request(status, false, false);
            assert_eq!(rq.status, Some(ItemStatus::Skipped));
            assert_eq!(rq.issue, Some(Issue::not_issue()));
        }

        let counted = finish_request(TestStatus::Skipped, false, true);
        assert_eq!(counted.issue, None);
    }

    #[test]
    fn test_failure_logs() {
        let result = AssertionResult::new(&["Cart"], "adds item", TestStatus::Failed)
            .with_failure("expected 2, got 3")
            .with_failure("second message");
        let attachment = Attachment {
            name: "shot.png".to_string(),
            mime_type: "image/png".to_string(),
            content: vec![1, 2, 3],
        };

        let logs = failure_logs(&result, vec![attachment.clone()]);

        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].0.level, LogLevel::Error);
        assert_eq!(logs[0].0.message, "expected 2, got 3");
        assert!(logs[0].1.is_none());
        assert_eq!(logs[1].0.level, LogLevel::Debug);
        assert_eq!(logs[1].0.message, "Attachment: shot.png");
        assert_eq!(logs[1].1, Some(attachment));
    }

    #[test]
    fn test_failure_log_without_message() {
        let result = AssertionResult::new(&[], "boom", TestStatus::Failed);
        let logs = failure_logs(&result, Vec::new());
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].0.message, "");
    }
}
