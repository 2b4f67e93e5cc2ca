// Request and response bodies of the reporting service

use serde::{Deserialize, Serialize};

use crate::time;

/// Launch mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchMode {
    #[default]
    Default,
    Debug,
}

impl std::str::FromStr for LaunchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEFAULT" => Ok(Self::Default),
            "DEBUG" => Ok(Self::Debug),
            other => Err(format!("unknown launch mode: {}", other)),
        }
    }
}

/// Key/value attribute attached to a launch or an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub system: bool,
}

impl ItemAttribute {
    pub fn new(key: Option<&str>, value: impl Into<String>) -> Self {
        Self {
            key: key.map(str::to_string),
            value: value.into(),
            system: false,
        }
    }

    pub fn system(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.to_string()),
            value: value.into(),
            system: true,
        }
    }

    /// Parse `key:value` or a bare `value`
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.split_once(':') {
            Some((key, value)) if !key.is_empty() => Some(Self::new(Some(key), value)),
            Some((_, value)) => Some(Self::new(None, value)),
            None => Some(Self::new(None, raw)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartLaunchRq {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub attributes: Vec<ItemAttribute>,
    pub mode: LaunchMode,
    pub rerun: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerun_of: Option<String>,
    pub start_time: i64,
    /// Existing launch to report into; no launch is created when set
    #[serde(skip)]
    pub id: Option<String>,
}

/// Report tree node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Suite,
    Test,
    Step,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Suite => "suite",
            ItemType::Test => "test",
            ItemType::Step => "step",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTestItemRq {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_ref: Option<String>,
    pub start_time: i64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retry: bool,
}

impl StartTestItemRq {
    /// Item started `duration_ms` ago
    pub fn new(item_type: ItemType, name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            item_type,
            code_ref: None,
            start_time: time::millis_ago(duration_ms),
            retry: false,
        }
    }

    pub fn with_code_ref(mut self, code_ref: impl Into<String>) -> Self {
        self.code_ref = Some(code_ref.into());
        self
    }

    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }
}

/// Final status of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Passed,
    Failed,
    Skipped,
}

/// Defect classification attached to a finished item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub issue_type: String,
}

impl Issue {
    pub const NOT_ISSUE: &'static str = "NOT_ISSUE";

    pub fn not_issue() -> Self {
        Self {
            issue_type: Self::NOT_ISSUE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishTestItemRq {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<Issue>,
    pub end_time: i64,
}

impl FinishTestItemRq {
    /// Finish without a status, letting the service derive it from children
    pub fn derived() -> Self {
        Self {
            status: None,
            retry: None,
            issue: None,
            end_time: time::now_unix_millis(),
        }
    }

    pub fn with_status(status: ItemStatus, retry: bool) -> Self {
        Self {
            status: Some(status),
            retry: Some(retry),
            issue: None,
            end_time: time::now_unix_millis(),
        }
    }

    pub fn with_issue(mut self, issue: Option<Issue>) -> Self {
        self.issue = issue;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveLogRq {
    pub message: String,
    pub level: LogLevel,
    pub time: i64,
}

impl SaveLogRq {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            time: time::now_unix_millis(),
        }
    }
}

/// Binary payload sent along with a log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishLaunchRq {
    pub end_time: i64,
}

impl Default for FinishLaunchRq {
    fn default() -> Self {
        Self {
            end_time: time::now_unix_millis(),
        }
    }
}

/// Response to finishing a launch
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LaunchFinished {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_parse() {
        assert_eq!(
            ItemAttribute::parse("platform:ios"),
            Some(ItemAttribute::new(Some("platform"), "ios"))
        );
        assert_eq!(
            ItemAttribute::parse("smoke"),
            Some(ItemAttribute::new(None, "smoke"))
        );
        assert_eq!(
            ItemAttribute::parse(":nightly"),
            Some(ItemAttribute::new(None, "nightly"))
        );
        assert_eq!(ItemAttribute::parse("  "), None);
    }

    #[test]
    fn test_system_attribute_serialization() {
        let attr = ItemAttribute::system("agent", "portal-reporter|0.4.0");
        let json = serde_json::to_value(&attr).unwrap();
        assert_eq!(json["system"], true);
        assert_eq!(json["key"], "agent");

        let plain = serde_json::to_value(ItemAttribute::new(None, "smoke")).unwrap();
        assert!(plain.get("system").is_none());
        assert!(plain.get("key").is_none());
    }

    #[test]
    fn test_start_item_serialization() {
        let rq = StartTestItemRq::new(ItemType::Step, "adds item", 0)
            .with_code_ref("src/cart.test.js/Cart/adds item")
            .with_retry(true);
        let json = serde_json::to_value(&rq).unwrap();
        assert_eq!(json["type"], "STEP");
        assert_eq!(json["codeRef"], "src/cart.test.js/Cart/adds item");
        assert_eq!(json["retry"], true);
        assert!(json["startTime"].is_i64());
    }

    #[test]
    fn test_finish_skipped_with_not_issue() {
        let rq = FinishTestItemRq::with_status(ItemStatus::Skipped, false)
            .with_issue(Some(Issue::not_issue()));
        let json = serde_json::to_value(&rq).unwrap();
        assert_eq!(json["status"], "SKIPPED");
        assert_eq!(json["retry"], false);
        assert_eq!(json["issue"]["issueType"], "NOT_ISSUE");
    }

    #[test]
    fn test_finish_derived_has_no_status() {
        let json = serde_json::to_value(FinishTestItemRq::derived()).unwrap();
        assert!(json.get("status").is_none());
        assert!(json.get("issue").is_none());
        assert!(json.get("endTime").is_some());
    }

    #[test]
    fn test_launch_mode_from_str() {
        assert_eq!("debug".parse::<LaunchMode>(), Ok(LaunchMode::Debug));
        assert_eq!("DEFAULT".parse::<LaunchMode>(), Ok(LaunchMode::Default));
        assert!("fast".parse::<LaunchMode>().is_err());
    }

    #[test]
    fn test_launch_id_not_serialized() {
        let rq = StartLaunchRq {
            name: "nightly".to_string(),
            description: None,
            attributes: Vec::new(),
            mode: LaunchMode::Default,
            rerun: false,
            rerun_of: None,
            start_time: 0,
            id: Some("external".to_string()),
        };
        let json = serde_json::to_value(&rq).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["mode"], "DEFAULT");
    }
}
