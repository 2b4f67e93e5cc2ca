pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod events;
pub mod logging;
pub mod report;
pub mod state;
pub mod time;

pub use client::{HttpClient, RecordingClient, ReportingClient};
pub use report::{PortalReporter, Reporter};
