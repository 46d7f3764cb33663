//! Work-item directory layout and lookup.
//!
//! Each work item lives at `.planlock/changes/<id>/` with `proposal.md`, `tasks.md`
//! and an append-only `worklog.md`. Closed items move under `changes/archive/`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::PlanlockError;
use crate::core::store::{PLANLOCK_DIR, StateRepository};
use crate::core::time::epoch_stamp;

pub const CHANGES_DIR: &str = "changes";
pub const ARCHIVE_DIR: &str = "archive";
pub const PROPOSAL_DOC: &str = "proposal.md";
pub const TASKS_DOC: &str = "tasks.md";
pub const WORKLOG_DOC: &str = "worklog.md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItemPaths {
    pub dir: PathBuf,
    pub proposal: PathBuf,
    pub tasks: PathBuf,
    pub worklog: PathBuf,
}

impl WorkItemPaths {
    pub fn new(project_root: &Path, work_item_id: &str) -> Self {
        let dir = changes_dir(project_root).join(work_item_id);
        Self {
            proposal: dir.join(PROPOSAL_DOC),
            tasks: dir.join(TASKS_DOC),
            worklog: dir.join(WORKLOG_DOC),
            dir,
        }
    }
}

/// Project-relative forms of the two frozen baseline documents.
pub fn baseline_docs(work_item_id: &str) -> [String; 2] {
    let base = format!("{PLANLOCK_DIR}/{CHANGES_DIR}/{work_item_id}");
    [format!("{base}/{PROPOSAL_DOC}"), format!("{base}/{TASKS_DOC}")]
}

pub fn changes_dir(project_root: &Path) -> PathBuf {
    project_root.join(PLANLOCK_DIR).join(CHANGES_DIR)
}

pub fn validate_work_item_id(work_item_id: &str) -> Result<(), PlanlockError> {
    if work_item_id.is_empty() {
        return Err(PlanlockError::ValidationError(
            "work item id cannot be empty".to_string(),
        ));
    }
    if work_item_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && !work_item_id.starts_with('.')
    {
        Ok(())
    } else {
        Err(PlanlockError::ValidationError(format!(
            "invalid work item id '{work_item_id}': allowed characters are [A-Za-z0-9_.-]"
        )))
    }
}

/// Known (non-archived) work items, sorted.
pub fn list_work_items(project_root: &Path) -> Result<Vec<String>, PlanlockError> {
    let dir = changes_dir(project_root);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(String::from) else {
            continue;
        };
        if name == ARCHIVE_DIR || name.starts_with('.') {
            continue;
        }
        ids.push(name);
    }
    ids.sort();
    Ok(ids)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    Ambiguous(Vec<String>),
    NotFound,
}

/// Exact id match first, then a case-insensitive substring match that must be unique.
pub fn lookup_work_item(project_root: &Path, query: &str) -> Result<Lookup, PlanlockError> {
    let ids = list_work_items(project_root)?;
    Ok(lookup_in(&ids, query))
}

pub fn lookup_in(ids: &[String], query: &str) -> Lookup {
    let query = query.trim();
    if query.is_empty() {
        return Lookup::NotFound;
    }
    if let Some(id) = ids.iter().find(|id| id.as_str() == query) {
        return Lookup::Found(id.clone());
    }
    let needle = query.to_lowercase();
    if let Some(id) = ids.iter().find(|id| id.to_lowercase() == needle) {
        return Lookup::Found(id.clone());
    }
    let hits: Vec<String> = ids
        .iter()
        .filter(|id| id.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    match hits.len() {
        0 => Lookup::NotFound,
        1 => Lookup::Found(hits[0].clone()),
        _ => Lookup::Ambiguous(hits),
    }
}

/// Move a work item under `changes/archive/`, returning its new location.
pub fn archive_work_item(project_root: &Path, work_item_id: &str) -> Result<PathBuf, PlanlockError> {
    validate_work_item_id(work_item_id)?;
    let paths = WorkItemPaths::new(project_root, work_item_id);
    if !paths.dir.is_dir() {
        return Err(PlanlockError::NotFound(format!(
            "work item '{work_item_id}' not found at {}",
            paths.dir.display()
        )));
    }
    let archive_root = changes_dir(project_root).join(ARCHIVE_DIR);
    fs::create_dir_all(&archive_root)?;
    let mut target = archive_root.join(work_item_id);
    if target.exists() {
        target = archive_root.join(format!("{work_item_id}-{}", epoch_stamp()));
    }
    fs::rename(&paths.dir, &target)?;
    Ok(target)
}

/// Archive a work item, then drop its lock. A failed move leaves the lock in place.
pub fn close_work_item<S>(
    project_root: &Path,
    store: &S,
    work_item_id: &str,
) -> Result<PathBuf, PlanlockError>
where
    S: StateRepository + ?Sized,
{
    let target = archive_work_item(project_root, work_item_id)?;
    store.remove_active_work_item(work_item_id)?;
    Ok(target)
}
