// Report item names and code references

use std::path::{Component, Path};

use crate::state::AssertionResult;

/// Separator between ancestor titles in lookup keys and code references
pub const NAME_SEPARATOR: &str = "/";

/// Lookup key of the deepest describe block: every ancestor title
pub fn full_test_name(result: &AssertionResult) -> String {
    join_titles(&result.ancestor_titles)
}

/// Every ancestor title followed by the test title
pub fn full_step_name(result: &AssertionResult) -> String {
    if result.ancestor_titles.is_empty() {
        return result.title.clone();
    }
    format!(
        "{}{}{}",
        full_test_name(result),
        NAME_SEPARATOR,
        result.title
    )
}

pub fn join_titles(titles: &[String]) -> String {
    titles.join(NAME_SEPARATOR)
}

/// Code reference linking a report item back to its source.
///
/// The test file is taken relative to `root` and always written with `/`
/// separators: `dir/sub/file.test.js/<name>`.
pub fn code_ref(test_path: &Path, root: &Path, name: &str) -> String {
    let relative = test_path.strip_prefix(root).unwrap_or(test_path);

    let dir = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();

    let file = relative
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    if dir.is_empty() {
        format!("{}/{}", file, name)
    } else {
        format!("{}/{}/{}", dir, file, name)
    }
}
