// Main entry point for portal-reporter

use anyhow::Result;
use clap::Parser;
use tracing::info;

use portal_reporter::cli::Cli;
use portal_reporter::commands;
use portal_reporter::config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    portal_reporter::logging::init(cli.verbose);

    if cli.verbose {
        info!("Starting portal-reporter v{}", env!("CARGO_PKG_VERSION"));
    }

    // Handle config flag
    if cli.config {
        print_config(&cli)?;
        return Ok(());
    }

    // Handle init_config flag
    if let Some(config_file) = &cli.init_config {
        let toml_content = config::Config::default().to_toml()?;
        std::fs::write(config_file, toml_content)?;
        println!("Configuration file created: {}", config_file.display());
        println!("\nYou can now edit the file to customize your settings.");
        print_precedence();
        return Ok(());
    }

    // Handle completion flag
    if let Some(shell_type) = &cli.completion {
        return commands::handle_completion(shell_type);
    }

    let totals = commands::run_report(&cli, cli.get_run_args()).await?;
    info!(
        "Replayed {} test(s) from {} file(s)",
        totals.total, totals.files
    );
    Ok(())
}

fn print_config(cli: &Cli) -> Result<()> {
    let config = commands::build_config(cli.get_run_args())?;

    println!("Current configuration:");
    println!("\n  Portal:");
    println!("    Endpoint: {}", config.portal.endpoint);
    println!(
        "    Project: {}",
        if config.portal.project.is_empty() {
            "not set"
        } else {
            config.portal.project.as_str()
        }
    );
    println!(
        "    API key: {}",
        if config.portal.api_key.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!("    Launch: {}", config.portal.launch);
    if let Some(ref description) = config.portal.description {
        println!("    Description: {}", description);
    }
    for attribute in &config.portal.attributes {
        match &attribute.key {
            Some(key) => println!("    Attribute: {}:{}", key, attribute.value),
            None => println!("    Attribute: {}", attribute.value),
        }
    }
    println!("    Mode: {:?}", config.portal.mode);
    if let Some(ref launch_id) = config.portal.launch_id {
        println!("    Existing launch: {}", launch_id);
    }
    println!("    Timeout: {}s", config.portal.timeout_secs);

    println!("\n  Reporting:");
    println!("    Disabled: {}", config.reporting.disabled);
    println!(
        "    Upload attachments: {}",
        !config.reporting.disable_upload_attachments
    );
    println!("    Skipped as issue: {}", config.reporting.skipped_issue);
    println!("    Log launch link: {}", config.reporting.log_launch_link);
    if let Some(ref path) = config.reporting.artifacts_path {
        println!("    Artifacts: {}", path.display());
    }
    if let Some(index) = config.reporting.rerun_index {
        println!("    Rerun index: {}", index);
    }

    print_precedence();
    Ok(())
}

fn print_precedence() {
    println!("\nConfiguration precedence:");
    println!("  1. Command-line arguments (highest)");
    println!("  2. Environment variables");
    println!("  3. Configuration file ({})", config::CONFIG_FILE_NAME);
    println!("  4. Built-in defaults (lowest)");
}
