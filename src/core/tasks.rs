//! Checklist parsing for baseline plan documents.
//!
//! A baseline plan is a markdown checklist (`- [ ] text` / `- [x] text`). Only lines of
//! exactly that shape become [`Task`] records; headings, prose and malformed checkboxes
//! are skipped without error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::core::error::PlanlockError;

static TASK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+\[([ xX])\]\s+(.*\S)\s*$").unwrap()
});

const KNOWN_EXTENSIONS: &str = "rs|ts|tsx|js|jsx|mjs|cjs|py|go|java|kt|rb|php|c|h|cc|cpp|hpp|cs|swift|vue|svelte|md|mdx|txt|json|yaml|yml|toml|html|css|scss|sql|sh|proto|graphql";

const KNOWN_TOP_DIRS: &str = "src|lib|app|apps|test|tests|docs|config|scripts|packages|components|pages|api|public|bin|crates|internal|cmd|pkg";

static BACKTICK_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"`([^`\s]+\.(?:{KNOWN_EXTENSIONS}))`")).unwrap()
});

static TOP_DIR_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:^|[\s(\[,])((?:{KNOWN_TOP_DIRS})/[A-Za-z0-9_./-]*\.(?:{KNOWN_EXTENSIONS}))\b"
    ))
    .unwrap()
});

static SEGMENT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s(\[,`])([A-Za-z0-9_.-]+(?:/[A-Za-z0-9_.-]+)+\.[A-Za-z0-9]{1,8})\b").unwrap()
});

/// One checklist entry of a plan document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub content: String,
    pub completed: bool,
    /// 1-based line in the source document. Display only; never part of identity.
    #[serde(default)]
    pub line: usize,
}

impl Task {
    pub fn new(content: impl Into<String>, completed: bool) -> Self {
        Self {
            content: normalize_content(&content.into()),
            completed,
            line: 0,
        }
    }

    /// Case-insensitive, whitespace-insensitive identity used for plan comparison.
    pub fn key(&self) -> String {
        task_key(&self.content)
    }
}

/// Collapse internal whitespace runs and trim.
pub fn normalize_content(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn task_key(content: &str) -> String {
    normalize_content(content).to_lowercase()
}

pub fn parse_tasks(document: &str) -> Vec<Task> {
    document
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let caps = TASK_LINE.captures(raw)?;
            let marker = caps.get(1)?.as_str();
            let content = normalize_content(caps.get(2)?.as_str());
            if content.is_empty() {
                return None;
            }
            Some(Task {
                content,
                completed: marker.eq_ignore_ascii_case("x"),
                line: idx + 1,
            })
        })
        .collect()
}

pub fn load_tasks(path: &Path) -> Result<Vec<Task>, PlanlockError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        PlanlockError::NotFound(format!("cannot read task list {}: {e}", path.display()))
    })?;
    Ok(parse_tasks(&raw))
}

/// Best-effort extraction of file paths mentioned in task text.
///
/// The result is an allow-list hint only. Paths that match none of the recognised
/// shapes are silently missed.
pub fn extract_affected_files(tasks: &[Task]) -> BTreeSet<String> {
    let mut files = BTreeSet::new();
    for task in tasks {
        for re in [&*BACKTICK_PATH, &*TOP_DIR_PATH, &*SEGMENT_PATH] {
            for caps in re.captures_iter(&task.content) {
                if let Some(m) = caps.get(1) {
                    let path = normalize_path(m.as_str().trim_end_matches(['.', ',']));
                    if !path.is_empty() {
                        files.insert(path);
                    }
                }
            }
        }
    }
    files
}

/// Unify separators, drop empty and `.` segments and fold `..` into its parent, so
/// equivalent spellings of a path compare as suffixes. Leading `/` is dropped too.
pub fn normalize_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." if parts.last().is_some_and(|last| *last != "..") => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

/// True when two normalized paths name the same file, allowing either one to be
/// an absolute form of the other.
pub fn paths_match(candidate: &str, target: &str) -> bool {
    if candidate.is_empty() || target.is_empty() {
        return false;
    }
    candidate == target
        || candidate.ends_with(&format!("/{target}"))
        || target.ends_with(&format!("/{candidate}"))
}

pub fn content_hash_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash of a document on disk; a missing document hashes as empty content.
pub fn file_hash_hex(path: &Path) -> Result<String, PlanlockError> {
    match fs::read(path) {
        Ok(bytes) => Ok(content_hash_hex(&bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(content_hash_hex(b"")),
        Err(e) => Err(PlanlockError::IoError(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_checklist_lines_only() {
        let doc = "# Tasks\n\nSome prose.\n- [ ] Create model\n- [x] Add tests\n  * [X] Nested done\n1. [ ] Numbered item\n";
        let tasks = parse_tasks(doc);
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0].content, "Create model");
        assert!(!tasks[0].completed);
        assert_eq!(tasks[0].line, 4);
        assert!(tasks[1].completed);
        assert!(tasks[2].completed);
        assert_eq!(tasks[3].content, "Numbered item");
    }

    #[test]
    fn test_skips_malformed_checkboxes() {
        let doc = "- [xx] two chars\n- [-] dash\n-[ ] no space\n- [ ]\n- [] empty brackets\nplain [ ] text";
        assert!(parse_tasks(doc).is_empty());
    }

    #[test]
    fn normalizes_whitespace_in_content() {
        let tasks = parse_tasks("- [ ]   Create    the   model  ");
        assert_eq!(tasks[0].content, "Create the model");
        assert_eq!(tasks[0].key(), "create the model");
    }

    #[test]
    fn extracts_paths_in_all_shapes() {
        let tasks = vec![
            Task::new("Update `README.md` with usage", false),
            Task::new("Add handler in src/api/users.rs", false),
            Task::new("Touch frontend/app.tsx and tests/users_test.py", false),
            Task::new("Refactor (lib/util.py).", false),
        ];
        let files = extract_affected_files(&tasks);
        assert!(files.contains("README.md"));
        assert!(files.contains("src/api/users.rs"));
        assert!(files.contains("frontend/app.tsx"));
        assert!(files.contains("tests/users_test.py"));
        assert!(files.contains("lib/util.py"));
    }

    #[test]
    fn duplicate_paths_collapse() {
        let tasks = vec![
            Task::new("Edit src/main.rs", false),
            Task::new("Test `src/main.rs` again", false),
        ];
        let files = extract_affected_files(&tasks);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn plain_words_are_not_paths() {
        let tasks = vec![Task::new("Write the docs and tests", false)];
        assert!(extract_affected_files(&tasks).is_empty());
    }

    #[test]
    fn test_normalize_path_strips_prefixes() {
        assert_eq!(normalize_path("./src/main.rs"), "src/main.rs");
        assert_eq!(normalize_path("/home/u/p/src/main.rs"), "home/u/p/src/main.rs");
        assert_eq!(normalize_path(r"src\core\gate.rs"), "src/core/gate.rs");
        assert_eq!(normalize_path("a/./b//c.md"), "a/b/c.md");
        assert_eq!(normalize_path("a/x/../b/c.md"), "a/b/c.md");
        assert_eq!(normalize_path("../up/c.md"), "../up/c.md");
        assert_eq!(normalize_path("a/../../c.md"), "../c.md");
    }

    #[test]
    fn test_paths_match_by_suffix() {
        assert!(paths_match("home/u/p/.planlock/changes/a/tasks.md", ".planlock/changes/a/tasks.md"));
        assert!(paths_match(".planlock/changes/a/tasks.md", ".planlock/changes/a/tasks.md"));
        assert!(!paths_match("x/mytasks.md", "tasks.md"));
        assert!(!paths_match("", "tasks.md"));
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash_hex(b"abc"), content_hash_hex(b"abc"));
        assert_ne!(content_hash_hex(b"abc"), content_hash_hex(b"abd"));
        assert_eq!(content_hash_hex(b"").len(), 64);
    }
}
