//! Keyword-driven workflow transitions.
//!
//! A user message that starts with one of the configured keywords followed by `:`
//! (`propose: ...`, `apply: my-change`, `checkpoint:`) becomes a workflow action. The
//! close family additionally accepts the bare keyword and the keyword followed by a
//! flag (`archive`, `archive --skip-review`). Anything else passes through untouched.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::core::assets::{self, render};
use crate::core::config::PlanlockConfig;
use crate::core::error::PlanlockError;
use crate::core::git::{BranchCoordinator, branch_name_for};
use crate::core::store::{ActiveWorkItem, StateRepository, WorkflowState};
use crate::core::tasks::{Task, file_hash_hex, load_tasks};
use crate::core::time::epoch_stamp;
use crate::core::workitems::{self, Lookup, WorkItemPaths};

static SKIP_REVIEW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)(?:--skip-review|--no-review|--skip|skip[- ]review)(?:\s|$)").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordFamily {
    Propose,
    Start,
    Checkpoint,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    pub family: KeywordFamily,
    /// Text after the keyword (and colon), trimmed.
    pub argument: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    Passthrough,
    Inject(String),
}

fn strip_keyword<'m>(message: &'m str, keyword: &str) -> Option<&'m str> {
    let keyword = keyword.trim();
    if keyword.is_empty() || message.len() < keyword.len() {
        return None;
    }
    let (head, tail) = message.split_at_checked(keyword.len())?;
    head.eq_ignore_ascii_case(keyword).then_some(tail)
}

/// Recognise a workflow keyword at the start of `message`.
pub fn match_keyword(message: &str, state: &WorkflowState) -> Option<KeywordMatch> {
    let message = message.trim();
    let families = [
        (KeywordFamily::Propose, &state.proposal_keywords),
        (KeywordFamily::Start, &state.start_keywords),
        (KeywordFamily::Checkpoint, &state.checkpoint_keywords),
        (KeywordFamily::Close, &state.close_keywords),
    ];
    for (family, keywords) in families {
        for keyword in keywords {
            let Some(tail) = strip_keyword(message, keyword) else {
                continue;
            };
            if let Some(arg) = tail.strip_prefix(':') {
                return Some(KeywordMatch {
                    family,
                    argument: arg.trim().to_string(),
                });
            }
            if family == KeywordFamily::Close {
                let rest = tail.trim();
                if tail.is_empty() || (tail.starts_with(char::is_whitespace) && rest.starts_with('-')) {
                    return Some(KeywordMatch {
                        family,
                        argument: rest.to_string(),
                    });
                }
            }
        }
    }
    None
}

/// Split a close argument into `(work item query, skip review)`.
pub fn parse_close_argument(argument: &str) -> (String, bool) {
    let skip = SKIP_REVIEW.is_match(argument);
    let query = SKIP_REVIEW.replace_all(argument, " ");
    let query = query
        .split_whitespace()
        .filter(|t| !t.starts_with('-'))
        .collect::<Vec<_>>()
        .join(" ");
    (query, skip)
}

/// Result of resolving a start request, before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPlan {
    AlreadyActive { work_item_id: String, branch: String },
    NeedsBranchConfirmation {
        work_item_id: String,
        branch: String,
        current_branch: String,
    },
    Ready(ActiveWorkItem),
}

pub struct KeywordDispatcher<'a> {
    pub project_root: &'a Path,
    pub store: &'a dyn StateRepository,
    pub branches: &'a dyn BranchCoordinator,
    pub config: &'a PlanlockConfig,
}

impl<'a> KeywordDispatcher<'a> {
    pub fn new(
        project_root: &'a Path,
        store: &'a dyn StateRepository,
        branches: &'a dyn BranchCoordinator,
        config: &'a PlanlockConfig,
    ) -> Self {
        Self {
            project_root,
            store,
            branches,
            config,
        }
    }

    /// Only state-write failures surface as `Err`; every other problem becomes an
    /// injected explanation for the user.
    pub fn dispatch(
        &self,
        message: &str,
        state: &WorkflowState,
    ) -> Result<DispatchAction, PlanlockError> {
        let Some(matched) = match_keyword(message, state) else {
            return Ok(DispatchAction::Passthrough);
        };
        tracing::info!(family = ?matched.family, argument = %matched.argument, "workflow keyword");
        match matched.family {
            KeywordFamily::Propose => Ok(self.propose(&matched.argument, state)),
            KeywordFamily::Start => self.start(&matched.argument, state),
            KeywordFamily::Checkpoint => Ok(self.checkpoint(&matched.argument, state)),
            KeywordFamily::Close => Ok(self.close(&matched.argument, state)),
        }
    }

    fn propose(&self, description: &str, state: &WorkflowState) -> DispatchAction {
        let start_keyword = first_keyword(&state.start_keywords, "apply");
        if description.is_empty() {
            return DispatchAction::Inject(format!(
                "The user sent a proposal keyword without a description. Ask them what change they want to propose, e.g. `{}: add rate limiting to the API`.",
                first_keyword(&state.proposal_keywords, "propose")
            ));
        }
        DispatchAction::Inject(render(
            assets::TEMPLATE_PROPOSE,
            &[("description", description), ("start_keyword", start_keyword)],
        ))
    }

    fn start(&self, query: &str, state: &WorkflowState) -> Result<DispatchAction, PlanlockError> {
        let plan = match self.prepare_start(query, state, false) {
            Ok(plan) => plan,
            Err(e) => return Ok(DispatchAction::Inject(start_failure_message(query, &e))),
        };
        match plan {
            StartPlan::AlreadyActive { work_item_id, branch } => Ok(DispatchAction::Inject(format!(
                "Work item `{work_item_id}` is already in implementation on branch `{branch}`. Continue with the approved tasks."
            ))),
            StartPlan::NeedsBranchConfirmation {
                work_item_id,
                branch,
                current_branch,
            } => Ok(DispatchAction::Inject(render(
                assets::TEMPLATE_START_CONFIRM,
                &[
                    ("work_item_id", &work_item_id),
                    ("branch", &branch),
                    ("current_branch", &current_branch),
                ],
            ))),
            StartPlan::Ready(item) => {
                self.store.upsert_active_work_item(item.clone())?;
                Ok(DispatchAction::Inject(started_message(&item)))
            }
        }
    }

    /// Resolve the work item, validate its plan and put the repository on its branch.
    ///
    /// Without `create_branch`, a missing branch yields
    /// [`StartPlan::NeedsBranchConfirmation`] instead of being created.
    pub fn prepare_start(
        &self,
        query: &str,
        state: &WorkflowState,
        create_branch: bool,
    ) -> Result<StartPlan, PlanlockError> {
        let work_item_id = resolve(self.project_root, query)?;
        let paths = WorkItemPaths::new(self.project_root, &work_item_id);
        let approved_tasks = load_tasks(&paths.tasks)?;
        if approved_tasks.is_empty() {
            return Err(PlanlockError::ValidationError(format!(
                "{} has no checklist items (`- [ ] task`); nothing to lock",
                paths.tasks.display()
            )));
        }

        let current_branch = self.branches.current_branch()?;
        if let Some(active) = state.find_by_branch(&current_branch)
            && active.work_item_id == work_item_id
        {
            return Ok(StartPlan::AlreadyActive {
                work_item_id,
                branch: current_branch,
            });
        }

        let branch = branch_name_for(&work_item_id);
        if let Some(other) = state.find_by_branch(&branch)
            && other.work_item_id != work_item_id
        {
            return Err(PlanlockError::ValidationError(format!(
                "branch '{branch}' is already locked to work item '{}'",
                other.work_item_id
            )));
        }

        if !self.branches.branch_exists(&branch)? {
            if !create_branch {
                return Ok(StartPlan::NeedsBranchConfirmation {
                    work_item_id,
                    branch,
                    current_branch,
                });
            }
            self.branches.create_branch(&branch)?;
        } else if current_branch != branch {
            self.branches.checkout(&branch)?;
        }

        Ok(StartPlan::Ready(ActiveWorkItem {
            tasks_doc_hash: file_hash_hex(&paths.tasks)?,
            proposal_doc_hash: file_hash_hex(&paths.proposal)?,
            work_item_id,
            branch,
            approved_tasks,
        }))
    }

    fn checkpoint(&self, note: &str, state: &WorkflowState) -> DispatchAction {
        let branch = match self.branches.current_branch() {
            Ok(branch) => branch,
            Err(e) => {
                return DispatchAction::Inject(format!(
                    "Checkpoint failed: could not determine the current git branch ({e})."
                ));
            }
        };
        let Some(active) = state.find_by_branch(&branch) else {
            return DispatchAction::Inject(format!(
                "Checkpoint needs an active work item, but none is locked on branch `{branch}`. Start one with `{}: <work-item-id>` first.",
                first_keyword(&state.start_keywords, "apply")
            ));
        };
        if !state.worklog_enabled {
            return DispatchAction::Inject(
                "Worklog is disabled for this project (`worklogEnabled` is false); no checkpoint entry will be written."
                    .to_string(),
            );
        }
        let paths = WorkItemPaths::new(self.project_root, &active.work_item_id);
        let (done, total) = progress(&active.approved_tasks);
        let note = if note.is_empty() {
            String::new()
        } else {
            format!("User note: {note}")
        };
        DispatchAction::Inject(render(
            assets::TEMPLATE_CHECKPOINT,
            &[
                ("work_item_id", &active.work_item_id),
                ("worklog_path", &paths.worklog.display().to_string()),
                ("timestamp", &epoch_stamp()),
                ("branch", &branch),
                ("completed_count", &done.to_string()),
                ("task_count", &total.to_string()),
                ("note", &note),
            ],
        ))
    }

    fn close(&self, argument: &str, state: &WorkflowState) -> DispatchAction {
        let (query, skip_flag) = parse_close_argument(argument);
        let work_item_id = match self.resolve_close_target(&query, state) {
            Ok(id) => id,
            Err(message) => return DispatchAction::Inject(message),
        };
        let skip_review = skip_flag || !state.review_agents_enabled;

        let paths = WorkItemPaths::new(self.project_root, &work_item_id);
        let active = state.find_by_id(&work_item_id);
        let branch = active
            .map(|a| a.branch.clone())
            .unwrap_or_else(|| branch_name_for(&work_item_id));
        let tasks: Vec<Task> = match active {
            Some(a) => a.approved_tasks.clone(),
            None => load_tasks(&paths.tasks).unwrap_or_default(),
        };
        let (done, total) = progress(&tasks);
        let incomplete = incomplete_summary(&tasks);
        let branch_summary = self.branch_summary();

        if skip_review {
            return DispatchAction::Inject(render(
                assets::TEMPLATE_CLOSE_IMMEDIATE,
                &[
                    ("work_item_id", &work_item_id),
                    ("branch", &branch),
                    ("branch_summary", &branch_summary),
                    ("completed_count", &done.to_string()),
                    ("task_count", &total.to_string()),
                    ("incomplete_tasks", &incomplete),
                ],
            ));
        }

        let worklog = if state.worklog_enabled {
            paths.worklog.display().to_string()
        } else {
            "(worklog disabled; skip this stage)".to_string()
        };
        DispatchAction::Inject(render(
            assets::TEMPLATE_CLOSE_REVIEW,
            &[
                ("work_item_id", &work_item_id),
                ("worklog_path", &worklog),
                ("branch", &branch),
                ("branch_summary", &branch_summary),
                ("changed_files", &self.changed_files_summary()),
                ("completed_count", &done.to_string()),
                ("task_count", &total.to_string()),
                ("incomplete_tasks", &incomplete),
            ],
        ))
    }

    /// Explicit query, else the item locked on this branch, else the only work item.
    fn resolve_close_target(&self, query: &str, state: &WorkflowState) -> Result<String, String> {
        if !query.is_empty() {
            return resolve(self.project_root, query).map_err(|e| close_failure_message(&e));
        }
        if let Ok(branch) = self.branches.current_branch()
            && let Some(active) = state.find_by_branch(&branch)
        {
            return Ok(active.work_item_id.clone());
        }
        let known = workitems::list_work_items(self.project_root)
            .map_err(|e| format!("Close failed: could not list work items ({e})."))?;
        match known.as_slice() {
            [only] => Ok(only.clone()),
            [] => Err("There is no work item to close.".to_string()),
            many => Err(format!(
                "Several work items exist and none is active on this branch. Ask the user which one to close: {}",
                many.iter()
                    .map(|id| format!("`{id}`"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }

    fn branch_summary(&self) -> String {
        match self.branches.ahead_behind(&self.config.base_branch) {
            Ok((ahead, behind)) => format!(
                "{ahead} commit(s) ahead, {behind} behind `{}`",
                self.config.base_branch
            ),
            Err(e) => {
                tracing::debug!(error = %e, "ahead/behind unavailable");
                "ahead/behind unavailable".to_string()
            }
        }
    }

    fn changed_files_summary(&self) -> String {
        match self.branches.changed_files(&self.config.base_branch) {
            Ok(files) if files.is_empty() => "- (none)".to_string(),
            Ok(files) => files
                .iter()
                .map(|f| format!("- {f}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => {
                tracing::debug!(error = %e, "changed files unavailable");
                "- (unavailable)".to_string()
            }
        }
    }
}

fn first_keyword<'s>(keywords: &'s [String], fallback: &'s str) -> &'s str {
    keywords.first().map(String::as_str).unwrap_or(fallback)
}

fn resolve(project_root: &Path, query: &str) -> Result<String, PlanlockError> {
    if query.trim().is_empty() {
        return Err(PlanlockError::ValidationError(
            "no work item id given".to_string(),
        ));
    }
    match workitems::lookup_work_item(project_root, query)? {
        Lookup::Found(id) => Ok(id),
        Lookup::Ambiguous(hits) => Err(PlanlockError::ValidationError(format!(
            "'{query}' matches several work items: {}",
            hits.join(", ")
        ))),
        Lookup::NotFound => {
            let known = workitems::list_work_items(project_root).unwrap_or_default();
            let known = if known.is_empty() {
                "none".to_string()
            } else {
                known.join(", ")
            };
            Err(PlanlockError::NotFound(format!(
                "work item '{query}' not found (known work items: {known})"
            )))
        }
    }
}

fn progress(tasks: &[Task]) -> (usize, usize) {
    (tasks.iter().filter(|t| t.completed).count(), tasks.len())
}

fn incomplete_summary(tasks: &[Task]) -> String {
    let open: Vec<String> = tasks
        .iter()
        .filter(|t| !t.completed)
        .map(|t| format!("- [ ] {}", t.content))
        .collect();
    if open.is_empty() {
        "All tasks are complete.".to_string()
    } else {
        format!("Incomplete tasks:\n{}", open.join("\n"))
    }
}

pub fn started_message(item: &ActiveWorkItem) -> String {
    let (done, total) = progress(&item.approved_tasks);
    let task_list = item
        .approved_tasks
        .iter()
        .map(|t| format!("- [{}] {}", if t.completed { "x" } else { " " }, t.content))
        .collect::<Vec<_>>()
        .join("\n");
    render(
        assets::TEMPLATE_STARTED,
        &[
            ("work_item_id", &item.work_item_id),
            ("branch", &item.branch),
            ("task_count", &total.to_string()),
            ("completed_count", &done.to_string()),
            ("task_list", &task_list),
        ],
    )
}

fn start_failure_message(query: &str, error: &PlanlockError) -> String {
    match error {
        PlanlockError::NotFound(detail) => format!(
            "Cannot start '{query}': {detail}. Ask the user which work item they meant, or propose a new one."
        ),
        PlanlockError::ValidationError(detail) => format!(
            "Cannot start '{query}': {detail}. Ask the user to clarify before making any changes."
        ),
        other => format!("Cannot start '{query}': {other}. Do not begin implementation."),
    }
}

fn close_failure_message(error: &PlanlockError) -> String {
    format!("Cannot close: {error}. Ask the user which work item to close.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WorkflowState {
        WorkflowState::default()
    }

    #[test]
    fn keyword_matching_table() {
        let s = state();
        let cases: &[(&str, Option<(KeywordFamily, &str)>)] = &[
            ("propose: add login", Some((KeywordFamily::Propose, "add login"))),
            ("PROPOSE:add login", Some((KeywordFamily::Propose, "add login"))),
            ("apply: my-change", Some((KeywordFamily::Start, "my-change"))),
            ("  Apply:  my-change  ", Some((KeywordFamily::Start, "my-change"))),
            ("checkpoint:", Some((KeywordFamily::Checkpoint, ""))),
            ("checkpoint: wrapped up parser", Some((KeywordFamily::Checkpoint, "wrapped up parser"))),
            ("archive", Some((KeywordFamily::Close, ""))),
            ("archive: my-change", Some((KeywordFamily::Close, "my-change"))),
            ("archive --skip-review", Some((KeywordFamily::Close, "--skip-review"))),
            ("archive the old logs", None),
            ("archived", None),
            ("apply my-change", None),
            ("please apply: x", None),
            ("checkpoint", None),
            ("", None),
        ];
        for (message, expected) in cases {
            let got = match_keyword(message, &s).map(|m| (m.family, m.argument));
            let expected = expected.map(|(f, a)| (f, a.to_string()));
            assert_eq!(got, expected, "message: {message:?}");
        }
    }

    #[test]
    fn custom_keywords_are_honoured() {
        let mut s = state();
        s.start_keywords = vec!["go".to_string(), "begin".to_string()];
        assert_eq!(
            match_keyword("begin: thing", &s).map(|m| m.family),
            Some(KeywordFamily::Start)
        );
        assert!(match_keyword("apply: thing", &s).is_none());
    }

    #[test]
    fn non_ascii_messages_do_not_panic() {
        assert!(match_keyword("é", &state()).is_none());
        assert!(match_keyword("日本語のメッセージ", &state()).is_none());
    }

    #[test]
    fn close_argument_flags() {
        assert_eq!(parse_close_argument(""), (String::new(), false));
        assert_eq!(parse_close_argument("--skip-review"), (String::new(), true));
        assert_eq!(parse_close_argument("my-change --no-review"), ("my-change".to_string(), true));
        assert_eq!(parse_close_argument("my-change skip review"), ("my-change".to_string(), true));
        assert_eq!(parse_close_argument("my-change"), ("my-change".to_string(), false));
    }

    #[test]
    fn incomplete_summary_lists_open_tasks() {
        let tasks = vec![Task::new("a", true), Task::new("b", false)];
        assert_eq!(incomplete_summary(&tasks), "Incomplete tasks:\n- [ ] b");
        assert_eq!(incomplete_summary(&tasks[..1]), "All tasks are complete.");
    }
}
