// Report module - host lifecycle reporters

pub mod attachments;
pub mod console;
pub mod markers;
pub mod naming;
pub mod portal;
pub mod step;

use futures::future::BoxFuture;
use std::path::Path;

use crate::state::FileResult;
pub use console::ConsoleReporter;
pub use markers::{MarkerSink, MemorySink, StdoutSink};
pub use portal::PortalReporter;

/// Reporter trait
///
/// The host calls the hooks one at a time and never re-enters a reporter.
pub trait Reporter: Send {
    /// Called once before any test file runs
    fn on_run_start(&mut self);

    /// Called with the results of one test file
    fn on_test_result(&mut self, test_path: &Path, result: &FileResult);

    /// Called once after the last file; resolves when the reporter is done
    fn on_run_complete(&mut self) -> BoxFuture<'_, ()>;
}
