//! Snapshot of the enforcement state for the `status` command.

use serde::Serialize;
use std::path::Path;

use crate::core::config::PlanlockConfig;
use crate::core::git::BranchCoordinator;
use crate::core::store::{Mode, WorkflowState};
use crate::core::sync::baseline_drift;
use crate::core::tasks::Task;
use crate::core::workitems::list_work_items;

#[derive(Debug, Clone, Serialize)]
pub struct LockedItemStatus {
    pub work_item_id: String,
    pub branch: String,
    pub completed: usize,
    pub total: usize,
    pub open_tasks: Vec<String>,
    pub drifted_docs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub mode: Mode,
    /// `None` when git could not report a branch.
    pub branch: Option<String>,
    pub locked: Option<LockedItemStatus>,
    pub active_work_items: Vec<String>,
    pub work_items: Vec<String>,
    pub base_branch: String,
    pub ahead: Option<usize>,
    pub behind: Option<usize>,
    pub changed_files: Vec<String>,
}

impl StatusReport {
    pub fn enforcement(&self) -> &'static str {
        if self.locked.is_some() {
            "locked"
        } else {
            "unrestricted"
        }
    }
}

/// Collect everything `status` shows. Git and filesystem problems degrade to empty
/// fields rather than failing the command.
pub fn build_status(
    project_root: &Path,
    state: &WorkflowState,
    branches: &dyn BranchCoordinator,
    config: &PlanlockConfig,
) -> StatusReport {
    let branch = branches
        .current_branch()
        .inspect_err(|e| tracing::debug!(error = %e, "current branch unavailable"))
        .ok();
    let locked = branch
        .as_deref()
        .and_then(|b| state.find_by_branch(b))
        .map(|item| {
            let (completed, total) = progress(&item.approved_tasks);
            LockedItemStatus {
                work_item_id: item.work_item_id.clone(),
                branch: item.branch.clone(),
                completed,
                total,
                open_tasks: item
                    .approved_tasks
                    .iter()
                    .filter(|t| !t.completed)
                    .map(|t| t.content.clone())
                    .collect(),
                drifted_docs: baseline_drift(project_root, item)
                    .into_iter()
                    .map(String::from)
                    .collect(),
            }
        });
    let (ahead, behind) = match branches.ahead_behind(&config.base_branch) {
        Ok((ahead, behind)) => (Some(ahead), Some(behind)),
        Err(e) => {
            tracing::debug!(error = %e, "ahead/behind unavailable");
            (None, None)
        }
    };
    StatusReport {
        mode: state.mode,
        branch,
        locked,
        active_work_items: state
            .active_work_items
            .iter()
            .map(|i| i.work_item_id.clone())
            .collect(),
        work_items: list_work_items(project_root).unwrap_or_default(),
        base_branch: config.base_branch.clone(),
        ahead,
        behind,
        changed_files: branches
            .changed_files(&config.base_branch)
            .unwrap_or_default(),
    }
}

fn progress(tasks: &[Task]) -> (usize, usize) {
    (tasks.iter().filter(|t| t.completed).count(), tasks.len())
}
