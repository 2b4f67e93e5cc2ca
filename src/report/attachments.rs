// Failure artifacts (screenshots, logs, videos) stored by the runner

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::client::Attachment;

/// Extensions picked up from artifact directories
pub const ATTACHMENT_EXTENSIONS: [&str; 3] = ["png", "log", "mp4"];

const REPLACEMENT: &str = "_";
const MAX_FILE_NAME_BYTES: usize = 255;

static ILLEGAL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[/\\?<>:*|"\x00-\x1f\x80-\x9f\s]"#).expect("invalid file name regex")
});
static RESERVED_NAMES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$")
        .expect("invalid reserved name regex")
});
static TRAILING_DOTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[. ]+$").expect("invalid trailing dot regex"));

/// Turn a test name into a token that is safe as a file or directory name
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized = ILLEGAL_CHARS.replace_all(name, REPLACEMENT);
    let sanitized = if sanitized == "." || sanitized == ".." {
        REPLACEMENT.into()
    } else {
        sanitized
    };
    let sanitized = RESERVED_NAMES.replace(&sanitized, REPLACEMENT);
    let sanitized = TRAILING_DOTS.replace(&sanitized, REPLACEMENT).into_owned();
    truncate_bytes(sanitized, MAX_FILE_NAME_BYTES)
}

fn truncate_bytes(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s
}

/// Directory token to search for; retries get the runner's ` (N)` suffix
pub fn search_token(full_name: &str, invocation: u32) -> String {
    let name = if invocation > 0 {
        format!("{} ({})", full_name, invocation.saturating_add(1))
    } else {
        full_name.to_string()
    };
    glob::Pattern::escape(&sanitize_file_name(&name))
}

/// Prefix added to attachment names of retried attempts
pub fn retry_prefix(invocation: u32) -> String {
    if invocation > 0 {
        format!("Retry {} - ", invocation.saturating_add(1))
    } else {
        String::new()
    }
}

pub fn mime_type_for(file_name: &str) -> &'static str {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some("mp4") => "video/mp4",
        Some("png") => "image/png",
        _ => "text/plain",
    }
}

/// Paths of the artifacts recorded for one attempt of a test
pub fn find_artifacts(root: &Path, full_name: &str, invocation: u32) -> Result<Vec<PathBuf>> {
    let root = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = format!(
        "{}/*/*{}*/*",
        root.trim_end_matches('/'),
        search_token(full_name, invocation)
    );

    let paths = glob::glob(&pattern)
        .with_context(|| format!("Invalid artifact pattern: {}", pattern))?;

    let mut files = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!(
                    "Skipping unreadable artifact entry {}: {}",
                    e.path().display(),
                    e.error()
                );
                continue;
            }
        };
        let wanted = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ATTACHMENT_EXTENSIONS.contains(&ext));
        if wanted && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load the artifacts of one attempt as attachments.
///
/// Returns nothing when no artifacts root is configured or nothing matches.
/// A matched file that cannot be read is an error.
pub fn resolve_attachments(
    artifacts_root: Option<&Path>,
    full_name: &str,
    invocation: u32,
) -> Result<Vec<Attachment>> {
    let Some(root) = artifacts_root else {
        return Ok(Vec::new());
    };

    let prefix = retry_prefix(invocation);
    find_artifacts(root, full_name, invocation)?
        .into_iter()
        .map(|path| {
            let base = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content = std::fs::read(&path)
                .with_context(|| format!("Failed to read attachment: {}", path.display()))?;
            Ok(Attachment {
                mime_type: mime_type_for(&base).to_string(),
                name: format!("{}{}", prefix, base),
                content,
            })
        })
        .collect()
}
