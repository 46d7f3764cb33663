#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use planlock::core::error::PlanlockError;
use planlock::core::git::BranchCoordinator;
use planlock::core::store::{ActiveWorkItem, WorkflowState};
use planlock::core::tasks::{Task, content_hash_hex};
use planlock::core::workitems::WorkItemPaths;
use tempfile::TempDir;

/// In-memory branch coordinator. `fail` makes every call return a git error.
pub struct FakeBranches {
    pub current: RefCell<String>,
    pub existing: RefCell<BTreeSet<String>>,
    pub created: RefCell<Vec<String>>,
    pub fail: bool,
}

impl FakeBranches {
    pub fn on(branch: &str) -> Self {
        Self {
            current: RefCell::new(branch.to_string()),
            existing: RefCell::new(BTreeSet::from([branch.to_string()])),
            created: RefCell::new(Vec::new()),
            fail: false,
        }
    }

    pub fn broken() -> Self {
        Self {
            fail: true,
            ..Self::on("main")
        }
    }

    pub fn with_branch(self, branch: &str) -> Self {
        self.existing.borrow_mut().insert(branch.to_string());
        self
    }

    pub fn current(&self) -> String {
        self.current.borrow().clone()
    }

    fn guard(&self) -> Result<(), PlanlockError> {
        if self.fail {
            Err(PlanlockError::GitError("fatal: not a git repository".into()))
        } else {
            Ok(())
        }
    }
}

impl BranchCoordinator for FakeBranches {
    fn current_branch(&self) -> Result<String, PlanlockError> {
        self.guard()?;
        Ok(self.current())
    }

    fn branch_exists(&self, branch: &str) -> Result<bool, PlanlockError> {
        self.guard()?;
        Ok(self.existing.borrow().contains(branch))
    }

    fn create_branch(&self, branch: &str) -> Result<(), PlanlockError> {
        self.guard()?;
        self.existing.borrow_mut().insert(branch.to_string());
        self.created.borrow_mut().push(branch.to_string());
        *self.current.borrow_mut() = branch.to_string();
        Ok(())
    }

    fn checkout(&self, branch: &str) -> Result<(), PlanlockError> {
        self.guard()?;
        *self.current.borrow_mut() = branch.to_string();
        Ok(())
    }

    fn ahead_behind(&self, _base: &str) -> Result<(usize, usize), PlanlockError> {
        self.guard()?;
        Ok((2, 0))
    }

    fn changed_files(&self, _base: &str) -> Result<Vec<String>, PlanlockError> {
        self.guard()?;
        Ok(vec!["src/models/user.rs".to_string()])
    }
}

pub fn project() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

/// Write a work item with a proposal and the given checklist body.
pub fn write_work_item(root: &Path, id: &str, tasks_md: &str) -> WorkItemPaths {
    let paths = WorkItemPaths::new(root, id);
    fs::create_dir_all(&paths.dir).expect("create work item dir");
    fs::write(&paths.proposal, format!("# {id}\n\nWhy this change.\n")).expect("write proposal");
    fs::write(&paths.tasks, tasks_md).expect("write tasks");
    paths
}

pub fn tasks(items: &[(&str, bool)]) -> Vec<Task> {
    items.iter().map(|(c, done)| Task::new(*c, *done)).collect()
}

pub fn locked_state(id: &str, approved: Vec<Task>) -> WorkflowState {
    let mut state = WorkflowState::default();
    state
        .upsert(ActiveWorkItem {
            work_item_id: id.to_string(),
            branch: format!("feature/{id}"),
            tasks_doc_hash: content_hash_hex(b""),
            proposal_doc_hash: content_hash_hex(b""),
            approved_tasks: approved,
        })
        .expect("upsert");
    state
}
