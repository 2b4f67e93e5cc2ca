// Console reporter - run summary on stdout

use futures::future::{BoxFuture, FutureExt};
use std::fmt::Write as _;
use std::path::Path;

use crate::state::{FileResult, RunTotals, TestStatus};

const HEAVY_RULE: &str =
    "════════════════════════════════════════════════════════════════════════════════";
const LIGHT_RULE: &str =
    "────────────────────────────────────────────────────────────────────────────────";

/// Where the run is being reported to
#[derive(Debug, Clone)]
pub struct EnvironmentInfo {
    pub endpoint: String,
    pub project: String,
    pub launch: String,
    pub dry_run: bool,
    pub disabled: bool,
}

/// Console reporter
pub struct ConsoleReporter {
    verbose: bool,
    env_info: EnvironmentInfo,
    totals: RunTotals,
    failures: Vec<String>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool, env_info: EnvironmentInfo) -> Self {
        Self {
            verbose,
            env_info,
            totals: RunTotals::default(),
            failures: Vec::new(),
        }
    }

    pub fn totals(&self) -> &RunTotals {
        &self.totals
    }

    /// Summary printed when the run completes
    pub fn render_summary(&self) -> String {
        let totals = &self.totals;
        let mut out = String::new();

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", HEAVY_RULE);
        if totals.failed > 0 {
            let _ = writeln!(
                out,
                "❌ FAILED ({} failed, {} passed in {}ms)",
                totals.failed, totals.passed, totals.total_duration_ms
            );
        } else {
            let _ = writeln!(
                out,
                "✅ PASSED ({} passed in {}ms)",
                totals.passed, totals.total_duration_ms
            );
        }
        let _ = writeln!(out, "{}", LIGHT_RULE);
        let _ = writeln!(out, "📊 Execution Statistics:");
        let _ = writeln!(out, "   • Test files: {}", totals.files);
        let _ = writeln!(out, "   • Total tests: {}", totals.total);
        let _ = writeln!(out, "   • Passed: {}", totals.passed);
        let _ = writeln!(out, "   • Failed: {}", totals.failed);
        let _ = writeln!(out, "   • Skipped: {}", totals.skipped);
        let _ = writeln!(out, "   • Retried: {}", totals.retried);
        let _ = writeln!(out, "   • Duration: {}ms", totals.total_duration_ms);
        let _ = writeln!(out, "{}", LIGHT_RULE);

        if !self.failures.is_empty() {
            let _ = writeln!(out, "❌ Failed Tests:");
            for failure in &self.failures {
                let _ = writeln!(out, "   • {}", failure);
            }
        }

        let _ = writeln!(out, "🔧 Environment:");
        let env = &self.env_info;
        if env.disabled {
            let _ = writeln!(out, "   • Reporting: Disabled");
        } else {
            let _ = writeln!(out, "   • Endpoint: {}", env.endpoint);
            let _ = writeln!(out, "   • Project: {}", env.project);
            let _ = writeln!(out, "   • Launch: {}", env.launch);
            let _ = writeln!(
                out,
                "   • Dry Run: {}",
                if env.dry_run {
                    "Enabled"
                } else {
                    "Disabled (real reporting calls)"
                }
            );
        }
        let _ = writeln!(out, "{}", HEAVY_RULE);
        out
    }
}

impl super::Reporter for ConsoleReporter {
    fn on_run_start(&mut self) {
        if self.verbose {
            println!("🚀 Reporting run to launch '{}'", self.env_info.launch);
        }
    }

    fn on_test_result(&mut self, test_path: &Path, result: &FileResult) {
        self.totals.add_file(result);

        for test in &result.test_results {
            if test.status == TestStatus::Failed {
                let mut line = format!("{} ({}ms)", test.full_name, test.duration_ms());
                if let Some(message) = test.failure_messages.first() {
                    let first_line = message.lines().next().unwrap_or_default();
                    line.push_str(&format!("\n      Error: {}", first_line));
                }
                self.failures.push(line);
            }

            if self.verbose {
                let mark = match test.status {
                    TestStatus::Passed => "✅ PASS",
                    TestStatus::Failed => "❌ FAIL",
                    _ => "🔍 SKIP",
                };
                println!("{} {}", mark, test.full_name);
            }
        }

        if self.verbose {
            println!(
                "📄 {} ({} tests)",
                test_path.display(),
                result.test_results.len()
            );
        }
    }

    fn on_run_complete(&mut self) -> BoxFuture<'_, ()> {
        print!("{}", self.render_summary());
        futures::future::ready(()).boxed()
    }
}
