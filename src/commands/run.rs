// Run command - replay results into the reporting service

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cli::Cli;
use crate::cli::args::RunArgs;
use crate::client::{HttpClient, ItemAttribute, RecordingClient, ReportingClient};
use crate::config::Config;
use crate::events::{self, InputFormat};
use crate::report::console::EnvironmentInfo;
use crate::report::{ConsoleReporter, PortalReporter, Reporter};
use crate::state::RunTotals;

/// Resolve configuration: file, then environment, then command line
pub fn build_config(args: &RunArgs) -> Result<Config> {
    let mut config = match &args.config_file {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?.unwrap_or_default(),
    };
    config.apply_process_env();
    apply_args(&mut config, args);
    Ok(config)
}

/// Command-line flags override every other source
pub fn apply_args(config: &mut Config, args: &RunArgs) {
    let portal = &mut config.portal;
    if let Some(endpoint) = &args.endpoint {
        portal.endpoint = endpoint.clone();
    }
    if let Some(project) = &args.project {
        portal.project = project.clone();
    }
    if let Some(launch) = &args.launch {
        portal.launch = launch.clone();
    }
    if let Some(description) = &args.description {
        portal.description = Some(description.clone());
    }
    if !args.attributes.is_empty() {
        portal.attributes = args
            .attributes
            .iter()
            .filter_map(|raw| ItemAttribute::parse(raw))
            .collect();
    }
    if let Some(launch_id) = &args.launch_id {
        portal.launch_id = Some(launch_id.clone());
    }

    let reporting = &mut config.reporting;
    if let Some(path) = &args.artifacts_path {
        reporting.artifacts_path = Some(path.clone());
    }
    if args.disable {
        reporting.disabled = true;
    }
    if args.no_attachments {
        reporting.disable_upload_attachments = true;
    }
    if args.log_launch_link {
        reporting.log_launch_link = true;
    }
    if let Some(index) = args.rerun_index {
        reporting.rerun_index = Some(index).filter(|n| *n > 0);
    }
}

pub async fn run_report(cli: &Cli, args: &RunArgs) -> Result<RunTotals> {
    let config = build_config(args)?;

    let recording = RecordingClient::new();
    let client: Arc<dyn ReportingClient> = if args.dry_run || config.reporting.disabled {
        info!("Reporting calls are recorded in memory only");
        Arc::new(recording.clone())
    } else {
        let http = HttpClient::new(config.http_client_config()?)?;
        info!(
            "Reporting to {} (project {})",
            config.portal.endpoint, config.portal.project
        );
        Arc::new(http)
    };

    let mut reporters: Vec<Box<dyn Reporter>> = Vec::new();
    reporters.push(Box::new(PortalReporter::new(client, config.clone())));
    if !args.quiet {
        let env_info = EnvironmentInfo {
            endpoint: config.portal.endpoint.clone(),
            project: config.portal.project.clone(),
            launch: config.portal.launch.clone(),
            dry_run: args.dry_run,
            disabled: config.reporting.disabled,
        };
        reporters.push(Box::new(ConsoleReporter::new(cli.verbose, env_info)));
    }

    let totals = match &args.input {
        Some(path) => {
            let reader = open_input(path)?;
            replay(args.format, reader, &mut reporters).await?
        }
        None => {
            let stdin = io::stdin();
            replay(args.format, stdin.lock(), &mut reporters).await?
        }
    };

    if args.dry_run {
        print!("{}", recording.render_tree());
    }
    Ok(totals)
}

fn open_input(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open results file: {}", path.display()))?;
    Ok(BufReader::new(file))
}

async fn replay(
    format: InputFormat,
    reader: impl BufRead,
    reporters: &mut [Box<dyn Reporter>],
) -> Result<RunTotals> {
    match format {
        InputFormat::Events => events::replay_events(reader, reporters).await,
        InputFormat::JestJson => events::replay_jest_json(reader, reporters).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LaunchMode;

    #[test]
    fn test_cli_overrides_config() {
        let mut config = Config::default();
        config.portal.project = "from-file".to_string();
        config.portal.attributes = vec![ItemAttribute::new(None, "file")];
        config.portal.mode = LaunchMode::Debug;

        let args = RunArgs {
            project: Some("from-cli".to_string()),
            attributes: vec!["os:linux".to_string()],
            no_attachments: true,
            rerun_index: Some(0),
            ..RunArgs::default()
        };
        apply_args(&mut config, &args);

        assert_eq!(config.portal.project, "from-cli");
        assert_eq!(
            config.portal.attributes,
            vec![ItemAttribute::new(Some("os"), "linux")]
        );
        assert_eq!(config.portal.mode, LaunchMode::Debug);
        assert!(config.reporting.disable_upload_attachments);
        assert_eq!(config.reporting.rerun_index, None);
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let mut config = Config::default();
        config.reporting.log_launch_link = true;
        config.portal.launch = "nightly".to_string();

        apply_args(&mut config, &RunArgs::default());

        assert!(config.reporting.log_launch_link);
        assert_eq!(config.portal.launch, "nightly");
    }
}
