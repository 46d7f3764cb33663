//! Workflow state persistence.
//!
//! All enforcement state lives in one pretty-printed JSON document at
//! `<project>/.planlock/state.json`. Reads never fail: a missing file means a fresh
//! project and a corrupt file is logged and treated the same way. Writes go through
//! [`write_atomic`] and propagate every failure.
//!
//! Concurrent writers are last-writer-wins; there is no locking.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::error::PlanlockError;
use crate::core::tasks::Task;
use crate::core::time::unique_id;

pub const PLANLOCK_DIR: &str = ".planlock";
pub const STATE_FILE: &str = "state.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Discussion,
    Implementation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveWorkItem {
    pub work_item_id: String,
    pub branch: String,
    #[serde(default)]
    pub tasks_doc_hash: String,
    #[serde(default)]
    pub proposal_doc_hash: String,
    #[serde(default)]
    pub approved_tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowState {
    pub mode: Mode,
    pub active_work_items: Vec<ActiveWorkItem>,
    pub proposal_keywords: Vec<String>,
    pub start_keywords: Vec<String>,
    pub checkpoint_keywords: Vec<String>,
    pub close_keywords: Vec<String>,
    pub review_agents_enabled: bool,
    pub worklog_enabled: bool,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            mode: Mode::Discussion,
            active_work_items: Vec::new(),
            proposal_keywords: vec!["propose".to_string()],
            start_keywords: vec!["apply".to_string()],
            checkpoint_keywords: vec!["checkpoint".to_string()],
            close_keywords: vec!["archive".to_string()],
            review_agents_enabled: true,
            worklog_enabled: true,
        }
    }
}

impl WorkflowState {
    pub fn find_by_id(&self, work_item_id: &str) -> Option<&ActiveWorkItem> {
        self.active_work_items
            .iter()
            .find(|item| item.work_item_id == work_item_id)
    }

    pub fn find_by_branch(&self, branch: &str) -> Option<&ActiveWorkItem> {
        self.active_work_items.iter().find(|item| item.branch == branch)
    }

    /// Insert or replace by id. A second item on an already-claimed branch is rejected.
    pub fn upsert(&mut self, item: ActiveWorkItem) -> Result<(), PlanlockError> {
        if let Some(other) = self
            .active_work_items
            .iter()
            .find(|i| i.branch == item.branch && i.work_item_id != item.work_item_id)
        {
            return Err(PlanlockError::ValidationError(format!(
                "branch '{}' is already locked to work item '{}'",
                item.branch, other.work_item_id
            )));
        }
        match self
            .active_work_items
            .iter_mut()
            .find(|i| i.work_item_id == item.work_item_id)
        {
            Some(existing) => *existing = item,
            None => self.active_work_items.push(item),
        }
        self.mode = Mode::Implementation;
        Ok(())
    }

    pub fn remove(&mut self, work_item_id: &str) -> bool {
        let before = self.active_work_items.len();
        self.active_work_items
            .retain(|item| item.work_item_id != work_item_id);
        if self.active_work_items.is_empty() {
            self.mode = Mode::Discussion;
        }
        before != self.active_work_items.len()
    }
}

/// Storage seam for workflow state. Components take `&dyn StateRepository` so tests can
/// substitute [`MemoryStateStore`].
pub trait StateRepository {
    /// Never fails; falls back to [`WorkflowState::default`].
    fn load(&self) -> WorkflowState;

    fn save(&self, state: &WorkflowState) -> Result<(), PlanlockError>;

    fn upsert_active_work_item(
        &self,
        item: ActiveWorkItem,
    ) -> Result<WorkflowState, PlanlockError> {
        let mut state = self.load();
        state.upsert(item)?;
        self.save(&state)?;
        Ok(state)
    }

    fn remove_active_work_item(&self, work_item_id: &str) -> Result<WorkflowState, PlanlockError> {
        let mut state = self.load();
        state.remove(work_item_id);
        self.save(&state)?;
        Ok(state)
    }
}

#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_project(project_root: &Path) -> Self {
        Self::new(state_path(project_root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn state_path(project_root: &Path) -> PathBuf {
    project_root.join(PLANLOCK_DIR).join(STATE_FILE)
}

impl StateRepository for FileStateStore {
    fn load(&self) -> WorkflowState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no state file, using defaults");
                return WorkflowState::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "state file unreadable, using defaults");
                return WorkflowState::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "state file corrupt, using defaults");
            WorkflowState::default()
        })
    }

    fn save(&self, state: &WorkflowState) -> Result<(), PlanlockError> {
        let mut bytes = serde_json::to_vec_pretty(state)?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes)
    }
}

/// Write to a sibling temp file, fsync, then rename over the target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PlanlockError> {
    let parent = path.parent().ok_or_else(|| {
        PlanlockError::ValidationError(format!("no parent directory for {}", path.display()))
    })?;
    fs::create_dir_all(parent)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("state");
    let tmp = parent.join(format!(".{file_name}.{}.tmp", unique_id()));

    let result = (|| -> Result<(), PlanlockError> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// In-process repository for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<WorkflowState>,
}

impl MemoryStateStore {
    pub fn new(state: WorkflowState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl StateRepository for MemoryStateStore {
    fn load(&self) -> WorkflowState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn save(&self, state: &WorkflowState) -> Result<(), PlanlockError> {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state.clone();
        Ok(())
    }
}
