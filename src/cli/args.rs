// CLI argument definitions using Clap

use clap::{Args, Parser};
use std::path::PathBuf;

use crate::events::InputFormat;

/// Report Jest test results to a ReportPortal instance
#[derive(Parser, Debug)]
#[command(name = "portal-reporter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Replay Jest test results into a ReportPortal launch",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub run_args: RunArgs,

    /// Enable verbose debug output
    #[arg(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Show current configuration and exit
    #[arg(long, default_value_t = false)]
    pub config: bool,

    /// Create default configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub init_config: Option<PathBuf>,

    /// Install shell completion (bash, zsh, fish, elvish, powershell)
    #[arg(long, value_name = "SHELL_TYPE", value_parser = ["bash", "zsh", "fish", "elvish", "powershell"])]
    pub completion: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Results to replay; standard input when omitted
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Input format (events, jest-json)
    #[arg(long, default_value = "events")]
    pub format: InputFormat,

    /// Record reporting calls in memory and print the resulting tree
    #[arg(short = 'd', long, default_value_t = false)]
    pub dry_run: bool,

    /// Do not print the run summary
    #[arg(short = 'q', long, default_value_t = false)]
    pub quiet: bool,

    /// Read configuration from this file instead of .portalrc.toml
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// ReportPortal API endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// ReportPortal project
    #[arg(long)]
    pub project: Option<String>,

    /// Launch name
    #[arg(long)]
    pub launch: Option<String>,

    /// Launch description
    #[arg(long)]
    pub description: Option<String>,

    /// Launch attribute as key:value or value (repeatable)
    #[arg(long = "attribute", value_name = "ATTRIBUTE")]
    pub attributes: Vec<String>,

    /// Root of the per-test artifact directories
    #[arg(long, value_name = "DIR")]
    pub artifacts_path: Option<PathBuf>,

    /// Report into an existing launch and leave it open
    #[arg(long, value_name = "ID")]
    pub launch_id: Option<String>,

    /// Disable reporting entirely
    #[arg(long, default_value_t = false)]
    pub disable: bool,

    /// Do not upload failure artifacts
    #[arg(long, default_value_t = false)]
    pub no_attachments: bool,

    /// Print the launch link when done
    #[arg(long, default_value_t = false)]
    pub log_launch_link: bool,

    /// Report every step as this rerun attempt
    #[arg(long, value_name = "N")]
    pub rerun_index: Option<u32>,
}

impl Cli {
    /// Get run arguments
    pub fn get_run_args(&self) -> &RunArgs {
        &self.run_args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "portal-reporter",
            "results.jsonl",
            "--format",
            "jest-json",
            "--attribute",
            "build:42",
            "--attribute",
            "smoke",
            "--rerun-index",
            "2",
            "--dry-run",
        ]);

        let args = cli.get_run_args();
        assert_eq!(args.input, Some(PathBuf::from("results.jsonl")));
        assert_eq!(args.format, InputFormat::JestJson);
        assert_eq!(args.attributes, vec!["build:42", "smoke"]);
        assert_eq!(args.rerun_index, Some(2));
        assert!(args.dry_run);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["portal-reporter"]);
        assert_eq!(cli.run_args.input, None);
        assert_eq!(cli.run_args.format, InputFormat::Events);
        assert!(!cli.verbose);
    }
}
