//! Git branch plumbing behind a trait.
//!
//! The enforcement core only needs a handful of branch facts; [`GitCli`] shells out to
//! `git` with a bounded wait and turns non-zero exits into [`PlanlockError::GitError`].

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::error::PlanlockError;

pub const BRANCH_PREFIX: &str = "feature/";

pub fn branch_name_for(work_item_id: &str) -> String {
    format!("{BRANCH_PREFIX}{work_item_id}")
}

pub trait BranchCoordinator {
    fn current_branch(&self) -> Result<String, PlanlockError>;
    fn branch_exists(&self, branch: &str) -> Result<bool, PlanlockError>;
    /// Create `branch` from HEAD and switch to it.
    fn create_branch(&self, branch: &str) -> Result<(), PlanlockError>;
    fn checkout(&self, branch: &str) -> Result<(), PlanlockError>;
    /// `(ahead, behind)` of HEAD relative to `base`.
    fn ahead_behind(&self, base: &str) -> Result<(usize, usize), PlanlockError>;
    fn changed_files(&self, base: &str) -> Result<Vec<String>, PlanlockError>;
}

#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
    timeout: Duration,
}

impl GitCli {
    pub fn new(repo_root: &Path, timeout: Duration) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            timeout,
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, PlanlockError> {
        run_with_timeout(&self.repo_root, args, self.timeout)
    }
}

/// Run `git <args>` in `dir`, returning trimmed stdout.
pub fn run_with_timeout(dir: &Path, args: &[&str], timeout: Duration) -> Result<String, PlanlockError> {
    let mut child = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| PlanlockError::GitError(format!("failed to spawn git: {e}")))?;

    let stdout = child.stdout.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });
    let stderr = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PlanlockError::Timeout(format!(
                "git {} exceeded {}s",
                args.join(" "),
                timeout.as_secs()
            )));
        }
        thread::sleep(Duration::from_millis(10));
    };

    let out = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
    let err = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
    if !status.success() {
        return Err(PlanlockError::GitError(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&err).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&out).trim().to_string())
}

impl BranchCoordinator for GitCli {
    fn current_branch(&self) -> Result<String, PlanlockError> {
        let branch = self.run(&["branch", "--show-current"])?;
        if branch.is_empty() {
            let short = self.run(&["rev-parse", "--short", "HEAD"])?;
            return Ok(format!("detached-{short}"));
        }
        Ok(branch)
    }

    fn branch_exists(&self, branch: &str) -> Result<bool, PlanlockError> {
        let reference = format!("refs/heads/{branch}");
        match self.run(&["show-ref", "--verify", "--quiet", &reference]) {
            Ok(_) => Ok(true),
            Err(PlanlockError::GitError(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn create_branch(&self, branch: &str) -> Result<(), PlanlockError> {
        self.run(&["checkout", "-b", branch]).map(|_| ())
    }

    fn checkout(&self, branch: &str) -> Result<(), PlanlockError> {
        self.run(&["checkout", branch]).map(|_| ())
    }

    fn ahead_behind(&self, base: &str) -> Result<(usize, usize), PlanlockError> {
        let range = format!("{base}...HEAD");
        let out = self.run(&["rev-list", "--left-right", "--count", &range])?;
        parse_left_right(&out)
            .map(|(behind, ahead)| (ahead, behind))
            .ok_or_else(|| PlanlockError::GitError(format!("unexpected rev-list output: {out}")))
    }

    fn changed_files(&self, base: &str) -> Result<Vec<String>, PlanlockError> {
        let out = self.run(&["diff", "--name-only", base])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}

/// Parse `git rev-list --left-right --count` output: `<left>\t<right>`.
fn parse_left_right(out: &str) -> Option<(usize, usize)> {
    let mut parts = out.split_whitespace();
    let left = parts.next()?.parse().ok()?;
    let right = parts.next()?.parse().ok()?;
    Some((left, right))
}
