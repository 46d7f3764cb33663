//! Tool-invocation authorization.
//!
//! Each branch is either Unrestricted (no active work item) or Locked to one work item.
//! In the Locked state the baseline documents are frozen and the todo list may only
//! flip completion flags. The Unrestricted state allows everything unless
//! `strict_discussion_mode` is on. Even then, drafting work-item documents and running
//! `planlock start|status|check-command` stay allowed so the workflow can advance.
//!
//! Evaluation is fail-open: every internal error becomes an allow through
//! [`evaluate_with_fallback`].

use std::path::Path;

use crate::core::bash_safety;
use crate::core::config::PlanlockConfig;
use crate::core::error::PlanlockError;
use crate::core::events::{ToolEvent, ToolInvocation, Verdict};
use crate::core::git::BranchCoordinator;
use crate::core::output::{quoted_list, single_line};
use crate::core::plan_diff::{self, format_violation};
use crate::core::store::{ActiveWorkItem, PLANLOCK_DIR, WorkflowState};
use crate::core::tasks::{extract_affected_files, normalize_path, paths_match};
use crate::core::workitems::{ARCHIVE_DIR, CHANGES_DIR, baseline_docs};

/// Subcommands of this tool the workflow asks the agent to run.
const WORKFLOW_SUBCOMMANDS: &[&str] = &["start", "status", "check-command", "--version", "--help"];

const COMMAND_PREVIEW_CHARS: usize = 200;
const FILE_PREVIEW_ITEMS: usize = 8;

/// Run one gate operation, converting any error into an allow.
pub fn evaluate_with_fallback<F>(tool: &str, op: F) -> Verdict
where
    F: FnOnce() -> Result<Verdict, PlanlockError>,
{
    match op() {
        Ok(verdict) => {
            if let Verdict::Block { message } = &verdict {
                tracing::info!(tool, reason = %single_line(message, 120), "blocked tool invocation");
            }
            verdict
        }
        Err(e) => {
            tracing::warn!(tool, error = %e, "gate evaluation failed, allowing");
            Verdict::allow()
        }
    }
}

pub struct EnforcementGate<'a> {
    pub project_root: &'a Path,
    pub branches: &'a dyn BranchCoordinator,
    pub config: &'a PlanlockConfig,
}

impl<'a> EnforcementGate<'a> {
    pub fn new(
        project_root: &'a Path,
        branches: &'a dyn BranchCoordinator,
        config: &'a PlanlockConfig,
    ) -> Self {
        Self {
            project_root,
            branches,
            config,
        }
    }

    /// Decide on a raw hook event. Never fails.
    pub fn evaluate(&self, state: &WorkflowState, event: &ToolEvent) -> Verdict {
        evaluate_with_fallback(&event.tool, || {
            let invocation = ToolInvocation::from_event(event)?;
            self.evaluate_invocation(state, &invocation)
        })
    }

    pub fn evaluate_invocation(
        &self,
        state: &WorkflowState,
        invocation: &ToolInvocation,
    ) -> Result<Verdict, PlanlockError> {
        match invocation {
            ToolInvocation::WriteFile { .. }
            | ToolInvocation::EditFile { .. }
            | ToolInvocation::MultiEdit { .. }
            | ToolInvocation::NotebookEdit { .. } => {
                let paths = invocation.target_paths();
                match self.locked_item(state)? {
                    Some(item) => Ok(self.check_locked_edit(item, &paths)),
                    None if self.config.strict_discussion_mode => {
                        let blocked: Vec<&str> = paths
                            .iter()
                            .copied()
                            .filter(|raw| !self.is_draft_document(state, raw))
                            .collect();
                        if blocked.is_empty() {
                            Ok(Verdict::allow())
                        } else {
                            Ok(Verdict::block(discussion_edit_message(state, &blocked)))
                        }
                    }
                    None => Ok(Verdict::allow()),
                }
            }
            ToolInvocation::TodoWrite { .. } => {
                let Some(item) = self.locked_item(state)? else {
                    return Ok(Verdict::allow());
                };
                let proposed = invocation.proposed_tasks().unwrap_or_default();
                let diff = plan_diff::diff(&item.approved_tasks, &proposed);
                if diff.is_scope_change() {
                    Ok(Verdict::block(format_violation(&item.work_item_id, &diff)))
                } else {
                    Ok(Verdict::allow())
                }
            }
            ToolInvocation::Shell { command } => {
                if !self.config.strict_discussion_mode || self.locked_item(state)?.is_some() {
                    return Ok(Verdict::allow());
                }
                match bash_safety::check_command_with(
                    command,
                    self.config.strict_shell_classification,
                    is_workflow_invocation,
                ) {
                    Ok(()) => Ok(Verdict::allow()),
                    Err(reason) => Ok(Verdict::block(discussion_shell_message(state, command, &reason.to_string()))),
                }
            }
            ToolInvocation::Other { .. } => Ok(Verdict::allow()),
        }
    }

    /// The work item locked on the current branch. Git is only consulted when some
    /// work item is active at all.
    fn locked_item<'s>(
        &self,
        state: &'s WorkflowState,
    ) -> Result<Option<&'s ActiveWorkItem>, PlanlockError> {
        if state.active_work_items.is_empty() {
            return Ok(None);
        }
        let branch = self.branches.current_branch()?;
        Ok(state.find_by_branch(&branch))
    }

    /// Path relative to the project root, with absolute paths inside the project
    /// stripped of the root first.
    fn project_relative(&self, raw: &str) -> String {
        let path = Path::new(raw);
        let relative = path.strip_prefix(self.project_root).unwrap_or(path);
        normalize_path(&relative.to_string_lossy())
    }

    /// A document under `.planlock/changes/<id>/` that no active work item has frozen.
    fn is_draft_document(&self, state: &WorkflowState, raw: &str) -> bool {
        let path = self.project_relative(raw);
        let Some(rest) = path.strip_prefix(&format!("{PLANLOCK_DIR}/{CHANGES_DIR}/")) else {
            return false;
        };
        let Some((work_item_id, _)) = rest.split_once('/') else {
            return false;
        };
        work_item_id != ARCHIVE_DIR
            && !state
                .active_work_items
                .iter()
                .any(|item| baseline_docs(&item.work_item_id).contains(&path))
    }

    fn check_locked_edit(&self, item: &ActiveWorkItem, paths: &[&str]) -> Verdict {
        let baseline = baseline_docs(&item.work_item_id);
        for raw in paths {
            let path = normalize_path(raw);
            if baseline.iter().any(|doc| paths_match(&path, doc)) {
                return Verdict::block(baseline_edit_message(&item.work_item_id, raw));
            }
        }

        let affected = extract_affected_files(&item.approved_tasks);
        if affected.is_empty() {
            return Verdict::allow();
        }
        let unlisted: Vec<&str> = paths
            .iter()
            .copied()
            .filter(|raw| {
                let path = normalize_path(raw);
                !affected.iter().any(|file| paths_match(&path, file))
            })
            .collect();
        if unlisted.is_empty() {
            return Verdict::allow();
        }

        let listed: Vec<&String> = affected.iter().collect();
        if self.config.enforce_affected_files {
            Verdict::block(format!(
                "Edit blocked: {} not among the files named in the approved plan for work item '{}'.\n\
                 Files in the plan: {}\n\
                 Next steps:\n\
                 \x20 1. Continue with the approved tasks and the files they name.\n\
                 \x20 2. If this file is needed, ask the user to approve the scope change.\n\
                 \x20 3. If approved, the user adds it to the baseline tasks document and re-starts the work item.",
                quoted_list(&unlisted, FILE_PREVIEW_ITEMS),
                item.work_item_id,
                quoted_list(&listed, FILE_PREVIEW_ITEMS),
            ))
        } else {
            Verdict::allow_with(format!(
                "Note: {} not mentioned in the approved plan for work item '{}'. Make sure this edit serves an approved task.",
                quoted_list(&unlisted, FILE_PREVIEW_ITEMS),
                item.work_item_id,
            ))
        }
    }
}

fn is_workflow_invocation(tokens: &[String]) -> bool {
    let [program, subcommand, ..] = tokens else {
        return false;
    };
    let name = Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(program.as_str());
    name == env!("CARGO_PKG_NAME") && WORKFLOW_SUBCOMMANDS.contains(&subcommand.as_str())
}

fn baseline_edit_message(work_item_id: &str, path: &str) -> String {
    format!(
        "Edit blocked: `{path}` is a baseline document of work item '{work_item_id}'.\n\
         The proposal and tasks documents are frozen while the work item is in implementation.\n\
         Next steps:\n\
         \x20 1. Continue with the approved tasks as planned.\n\
         \x20 2. If the plan itself must change, ask the user to approve the scope change.\n\
         \x20 3. If approved, the user edits the baseline manually and re-starts the work item."
    )
}

fn regain_write_access(state: &WorkflowState) -> String {
    let start = state.start_keywords.first().map(String::as_str).unwrap_or("apply");
    let propose = state
        .proposal_keywords
        .first()
        .map(String::as_str)
        .unwrap_or("propose");
    format!(
        "To make changes, either start an approved work item with `{start}: <work-item-id>` \
         or propose a new one with `{propose}: <description>`."
    )
}

fn discussion_edit_message(state: &WorkflowState, paths: &[&str]) -> String {
    format!(
        "Edit blocked: {} cannot be modified in discussion mode (no work item is active on this branch).\n\
         Drafting `{PLANLOCK_DIR}/{CHANGES_DIR}/<id>/proposal.md` and `tasks.md` is allowed.\n{}",
        quoted_list(paths, FILE_PREVIEW_ITEMS),
        regain_write_access(state)
    )
}

fn discussion_shell_message(state: &WorkflowState, command: &str, reason: &str) -> String {
    format!(
        "Shell command blocked in discussion mode: `{}` is not read-only ({reason}).\n{}",
        single_line(command, COMMAND_PREVIEW_CHARS),
        regain_write_access(state)
    )
}
