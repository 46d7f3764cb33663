//! Post-invocation bookkeeping.
//!
//! After a successful todo-list write on a locked branch, completion flags flow back
//! into the approved baseline. Task content never changes here; a payload that adds or
//! removes tasks is ignored (the gate already rejected it).

use std::path::Path;

use crate::core::error::PlanlockError;
use crate::core::events::{ToolEvent, ToolInvocation};
use crate::core::git::BranchCoordinator;
use crate::core::plan_diff::{self, apply_completion};
use crate::core::store::{ActiveWorkItem, StateRepository};
use crate::core::tasks::file_hash_hex;
use crate::core::workitems::{PROPOSAL_DOC, TASKS_DOC, WorkItemPaths};

/// Baseline documents whose on-disk content no longer matches the hash stored at lock
/// time. Documents without a stored hash are not checked.
pub fn baseline_drift(project_root: &Path, item: &ActiveWorkItem) -> Vec<&'static str> {
    let paths = WorkItemPaths::new(project_root, &item.work_item_id);
    let mut drifted = Vec::new();
    for (name, path, stored) in [
        (TASKS_DOC, &paths.tasks, &item.tasks_doc_hash),
        (PROPOSAL_DOC, &paths.proposal, &item.proposal_doc_hash),
    ] {
        if stored.is_empty() {
            continue;
        }
        match file_hash_hex(path) {
            Ok(current) if &current != stored => drifted.push(name),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "baseline unreadable, drift unknown");
            }
        }
    }
    drifted
}

pub fn drift_advisory(work_item_id: &str, drifted: &[&str]) -> Option<String> {
    if drifted.is_empty() {
        return None;
    }
    Some(format!(
        "Warning: baseline {} of work item '{work_item_id}' changed on disk since the work item was started. \
         The locked plan still reflects the original; re-start the work item if the change was approved.",
        drifted.join(" and ")
    ))
}

pub struct PostToolSync<'a> {
    pub project_root: &'a Path,
    pub store: &'a dyn StateRepository,
    pub branches: &'a dyn BranchCoordinator,
}

impl<'a> PostToolSync<'a> {
    pub fn new(
        project_root: &'a Path,
        store: &'a dyn StateRepository,
        branches: &'a dyn BranchCoordinator,
    ) -> Self {
        Self {
            project_root,
            store,
            branches,
        }
    }

    /// Apply one post-invocation event, returning optional advisory text.
    ///
    /// Only a failed state write is an error; anything else is logged and skipped.
    pub fn apply(&self, event: &ToolEvent) -> Result<Option<String>, PlanlockError> {
        if !event.success {
            return Ok(None);
        }
        let invocation = match ToolInvocation::from_event(event) {
            Ok(invocation) => invocation,
            Err(e) => {
                tracing::warn!(tool = %event.tool, error = %e, "skipping post-invocation sync");
                return Ok(None);
            }
        };
        let watched = matches!(invocation, ToolInvocation::TodoWrite { .. })
            || !invocation.target_paths().is_empty();
        if !watched {
            return Ok(None);
        }

        let state = self.store.load();
        if state.active_work_items.is_empty() {
            return Ok(None);
        }
        let branch = match self.branches.current_branch() {
            Ok(branch) => branch,
            Err(e) => {
                tracing::warn!(error = %e, "cannot determine branch, skipping sync");
                return Ok(None);
            }
        };
        let Some(item) = state.find_by_branch(&branch) else {
            return Ok(None);
        };

        let mut notes = Vec::new();
        if let Some(proposed) = invocation.proposed_tasks() {
            let diff = plan_diff::diff(&item.approved_tasks, &proposed);
            if diff.is_scope_change() {
                tracing::debug!(work_item = %item.work_item_id, "todo payload changes scope, not syncing");
            } else if !diff.modified.is_empty() {
                let mut updated = item.clone();
                updated.approved_tasks = apply_completion(&item.approved_tasks, &proposed);
                let done = updated.approved_tasks.iter().filter(|t| t.completed).count();
                let total = updated.approved_tasks.len();
                tracing::info!(work_item = %updated.work_item_id, done, total, "synced task completion");
                notes.push(format!(
                    "Progress for '{}': {done}/{total} approved tasks complete.",
                    updated.work_item_id
                ));
                self.store.upsert_active_work_item(updated)?;
            }
        }
        if let Some(advisory) =
            drift_advisory(&item.work_item_id, &baseline_drift(self.project_root, item))
        {
            notes.push(advisory);
        }
        Ok((!notes.is_empty()).then(|| notes.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tasks::content_hash_hex;
    use std::fs;

    #[test]
    fn drift_detects_edited_tasks_document() {
        let dir = tempfile::tempdir().unwrap();
        let paths = WorkItemPaths::new(dir.path(), "demo");
        fs::create_dir_all(&paths.dir).unwrap();
        fs::write(&paths.tasks, "- [ ] a\n").unwrap();
        fs::write(&paths.proposal, "# Demo\n").unwrap();
        let item = ActiveWorkItem {
            work_item_id: "demo".into(),
            branch: "feature/demo".into(),
            tasks_doc_hash: content_hash_hex(b"- [ ] a\n"),
            proposal_doc_hash: content_hash_hex(b"# Demo\n"),
            approved_tasks: Vec::new(),
        };
        assert!(baseline_drift(dir.path(), &item).is_empty());

        fs::write(&paths.tasks, "- [ ] a\n- [ ] b\n").unwrap();
        assert_eq!(baseline_drift(dir.path(), &item), vec![TASKS_DOC]);
        let advisory = drift_advisory("demo", &[TASKS_DOC]).unwrap();
        assert!(advisory.contains("tasks.md"));
    }

    #[test]
    fn empty_stored_hash_is_not_checked() {
        let dir = tempfile::tempdir().unwrap();
        let item = ActiveWorkItem {
            work_item_id: "demo".into(),
            branch: "feature/demo".into(),
            tasks_doc_hash: String::new(),
            proposal_doc_hash: String::new(),
            approved_tasks: Vec::new(),
        };
        assert!(baseline_drift(dir.path(), &item).is_empty());
        assert!(drift_advisory("demo", &[]).is_none());
    }
}
