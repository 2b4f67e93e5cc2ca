// Configuration file and environment handling

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::client::{HttpClientConfig, ItemAttribute, LaunchMode};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub portal: PortalConfig,

    #[serde(default)]
    pub reporting: ReportingConfig,
}

/// Connection and launch settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortalConfig {
    /// API root of the reporting service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Project the launch is reported into
    #[serde(default)]
    pub project: String,

    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Launch name
    #[serde(default = "default_launch")]
    pub launch: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,

    #[serde(default)]
    pub mode: LaunchMode,

    /// Report into an existing launch and leave it open
    #[serde(default)]
    pub launch_id: Option<String>,

    #[serde(default)]
    pub rerun: bool,

    #[serde(default)]
    pub rerun_of: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project: String::new(),
            api_key: None,
            launch: default_launch(),
            description: None,
            attributes: Vec::new(),
            mode: LaunchMode::Default,
            launch_id: None,
            rerun: false,
            rerun_of: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Reporter behaviour toggles
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReportingConfig {
    /// Turn every lifecycle hook into a no-op
    #[serde(default)]
    pub disabled: bool,

    /// Send failure messages without artifact attachments
    #[serde(default)]
    pub disable_upload_attachments: bool,

    /// Let skipped tests count as issues to investigate
    #[serde(default)]
    pub skipped_issue: bool,

    /// Print the launch link when the run completes
    #[serde(default)]
    pub log_launch_link: bool,

    /// Root of the per-test artifact directories
    #[serde(default)]
    pub artifacts_path: Option<PathBuf>,

    /// Forced rerun attempt; every step of the run is reported as this retry
    #[serde(default)]
    pub rerun_index: Option<u32>,
}

// Environment variables
pub const ENV_ENDPOINT: &str = "RP_ENDPOINT";
pub const ENV_PROJECT: &str = "RP_PROJECT_NAME";
pub const ENV_API_KEY: &str = "RP_API_KEY";
pub const ENV_TOKEN: &str = "RP_TOKEN";
pub const ENV_LAUNCH: &str = "RP_LAUNCH";
pub const ENV_DESCRIPTION: &str = "RP_DESCRIPTION";
pub const ENV_ATTRIBUTES: &str = "RP_ATTRIBUTES";
pub const ENV_MODE: &str = "RP_MODE";
pub const ENV_LAUNCH_ID: &str = "RP_LAUNCH_ID";
pub const ENV_ARTIFACTS_PATH: &str = "RP_ARTIFACTS_PATH";
pub const ENV_DISABLED: &str = "RP_DISABLED";
pub const ENV_DISABLE_UPLOAD_ATTACHMENTS: &str = "RP_DISABLE_UPLOAD_ATTACHMENTS";
pub const ENV_SKIPPED_ISSUE: &str = "RP_SKIPPED_ISSUE";
pub const ENV_LOG_LAUNCH_LINK: &str = "RP_LOG_LAUNCH_LINK";
pub const ENV_RERUN_INDEX: &str = "DETOX_RERUN_INDEX";

pub const CONFIG_FILE_NAME: &str = ".portalrc.toml";

pub fn default_endpoint() -> String {
    String::from("http://localhost:8080/api/v1")
}

pub fn default_launch() -> String {
    String::from("Jest Launch")
}

pub fn default_timeout() -> u64 {
    30
}

/// Parse `true/false`, `1/0`, `yes/no`
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `key:value;value;key2:value2`
pub fn parse_attributes(value: &str) -> Vec<ItemAttribute> {
    value.split(';').filter_map(ItemAttribute::parse).collect()
}

/// Only a positive index forces a rerun
pub fn parse_rerun_index(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Result<Option<Self>> {
        // Check locations in order:
        // 1. .portalrc.toml (current directory)
        // 2. ~/.portalrc.toml (home directory)
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE_NAME));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(CONFIG_FILE_NAME));
        }

        for path in &paths {
            if path.exists() {
                return Self::load_from_file(path).map(Some);
            }
        }

        Ok(None)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Generate configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Overlay values from the process environment
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Overlay values from an environment lookup; set variables win over the file
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let portal = &mut self.portal;
        if let Some(v) = lookup(ENV_ENDPOINT) {
            portal.endpoint = v;
        }
        if let Some(v) = lookup(ENV_PROJECT) {
            portal.project = v;
        }
        if let Some(v) = lookup(ENV_API_KEY).or_else(|| lookup(ENV_TOKEN)) {
            portal.api_key = Some(v);
        }
        if let Some(v) = lookup(ENV_LAUNCH) {
            portal.launch = v;
        }
        if let Some(v) = lookup(ENV_DESCRIPTION) {
            portal.description = Some(v);
        }
        if let Some(v) = lookup(ENV_ATTRIBUTES) {
            portal.attributes = parse_attributes(&v);
        }
        if let Some(v) = lookup(ENV_MODE) {
            match v.parse() {
                Ok(mode) => portal.mode = mode,
                Err(e) => warn!("Ignoring {}: {}", ENV_MODE, e),
            }
        }
        if let Some(v) = lookup(ENV_LAUNCH_ID) {
            portal.launch_id = Some(v).filter(|id| !id.trim().is_empty());
        }

        let reporting = &mut self.reporting;
        if let Some(v) = lookup(ENV_ARTIFACTS_PATH) {
            reporting.artifacts_path = Some(PathBuf::from(v));
        }
        apply_bool(&lookup, ENV_DISABLED, &mut reporting.disabled);
        apply_bool(
            &lookup,
            ENV_DISABLE_UPLOAD_ATTACHMENTS,
            &mut reporting.disable_upload_attachments,
        );
        apply_bool(&lookup, ENV_SKIPPED_ISSUE, &mut reporting.skipped_issue);
        apply_bool(&lookup, ENV_LOG_LAUNCH_LINK, &mut reporting.log_launch_link);
        if let Some(v) = lookup(ENV_RERUN_INDEX) {
            reporting.rerun_index = parse_rerun_index(&v);
        }
    }

    /// Check that everything needed to talk to the service is present
    pub fn validate(&self) -> Result<()> {
        if self.reporting.disabled {
            return Ok(());
        }
        url::Url::parse(&self.portal.endpoint)
            .with_context(|| format!("Invalid endpoint: {}", self.portal.endpoint))?;
        if self.portal.project.trim().is_empty() {
            bail!("Project name is required (set {} or [portal].project)", ENV_PROJECT);
        }
        if self.api_key().is_none() {
            bail!("API key is required (set {} or [portal].api_key)", ENV_API_KEY);
        }
        Ok(())
    }

    fn api_key(&self) -> Option<&str> {
        self.portal
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// Settings for the HTTP reporting client
    pub fn http_client_config(&self) -> Result<HttpClientConfig> {
        self.validate()?;
        Ok(HttpClientConfig {
            endpoint: self.portal.endpoint.clone(),
            project: self.portal.project.clone(),
            api_key: self.api_key().unwrap_or_default().to_string(),
            timeout: Duration::from_secs(self.portal.timeout_secs),
        })
    }
}

fn apply_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut bool) {
    if let Some(raw) = lookup(key) {
        match parse_bool(&raw) {
            Some(value) => *target = value,
            None => warn!("Ignoring {}: expected true or false, got {:?}", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[portal]
endpoint = "https://rp.example.com/api/v1"
project = "mobile"
api_key = "secret"
launch = "Detox iOS"
mode = "DEBUG"
attributes = [{ key = "platform", value = "ios" }, { value = "smoke" }]

[reporting]
disable_upload_attachments = true
skipped_issue = true
artifacts_path = "artifacts"
"#;

        let config = Config::parse(toml).expect("Failed to parse config");
        assert_eq!(config.portal.endpoint, "https://rp.example.com/api/v1");
        assert_eq!(config.portal.project, "mobile");
        assert_eq!(config.portal.launch, "Detox iOS");
        assert_eq!(config.portal.mode, LaunchMode::Debug);
        assert_eq!(config.portal.attributes.len(), 2);
        assert_eq!(config.portal.attributes[1].key, None);
        assert!(config.reporting.disable_upload_attachments);
        assert!(config.reporting.skipped_issue);
        assert_eq!(
            config.reporting.artifacts_path,
            Some(PathBuf::from("artifacts"))
        );
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let toml = Config::default().to_toml().unwrap();
        let parsed = Config::parse(&toml).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::parse("[portal]\nproject = \"file\"\n").unwrap();
        config.apply_env(env(&[
            (ENV_PROJECT, "env"),
            (ENV_TOKEN, "token-from-env"),
            (ENV_ATTRIBUTES, "build:42;nightly"),
            (ENV_SKIPPED_ISSUE, "yes"),
            (ENV_RERUN_INDEX, "2"),
        ]));

        assert_eq!(config.portal.project, "env");
        assert_eq!(config.portal.api_key.as_deref(), Some("token-from-env"));
        assert_eq!(
            config.portal.attributes,
            vec![
                ItemAttribute::new(Some("build"), "42"),
                ItemAttribute::new(None, "nightly"),
            ]
        );
        assert!(config.reporting.skipped_issue);
        assert_eq!(config.reporting.rerun_index, Some(2));
    }

    #[test]
    fn test_api_key_wins_over_token() {
        let mut config = Config::default();
        config.apply_env(env(&[(ENV_API_KEY, "key"), (ENV_TOKEN, "token")]));
        assert_eq!(config.portal.api_key.as_deref(), Some("key"));
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[(ENV_DISABLED, "maybe"), (ENV_MODE, "turbo")]));
        assert!(!config.reporting.disabled);
        assert_eq!(config.portal.mode, LaunchMode::Default);
    }

    #[test]
    fn test_rerun_index_must_be_positive() {
        assert_eq!(parse_rerun_index("0"), None);
        assert_eq!(parse_rerun_index("-1"), None);
        assert_eq!(parse_rerun_index("abc"), None);
        assert_eq!(parse_rerun_index(" 3 "), Some(3));
    }

    #[test]
    fn test_validate_requires_project_and_key() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.portal.project = "mobile".to_string();
        assert!(config.validate().is_err());

        config.portal.api_key = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_skipped_when_disabled() {
        let mut config = Config::default();
        config.reporting.disabled = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[reporting]\nlog_launch_link = true\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert!(config.reporting.log_launch_link);
        assert!(!config.reporting.skipped_issue);
    }
}
