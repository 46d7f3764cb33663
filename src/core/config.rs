//! Enforcement configuration loaded from `.planlock/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::error::PlanlockError;
use crate::core::store::PLANLOCK_DIR;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlanlockConfig {
    /// Block write tools and non-read-only shell while no work item is locked.
    pub strict_discussion_mode: bool,
    /// Block edits to files the locked plan never mentions.
    pub enforce_affected_files: bool,
    pub base_branch: String,
    pub io_timeout_secs: u64,
    pub strict_shell_classification: bool,
}

impl Default for PlanlockConfig {
    fn default() -> Self {
        Self {
            strict_discussion_mode: false,
            enforce_affected_files: false,
            base_branch: "main".to_string(),
            io_timeout_secs: 5,
            strict_shell_classification: true,
        }
    }
}

impl PlanlockConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs.max(1))
    }
}

/// Missing config is not an error; an unparseable one is.
pub fn load_config(project_root: &Path) -> Result<PlanlockConfig, PlanlockError> {
    let path = project_root.join(PLANLOCK_DIR).join(CONFIG_FILE);
    if !path.exists() {
        return Ok(PlanlockConfig::default());
    }
    let content = fs::read_to_string(&path).map_err(PlanlockError::IoError)?;
    toml::from_str(&content)
        .map_err(|e| PlanlockError::ConfigError(format!("{}: {e}", path.display())))
}

/// Hook entry points cannot fail on config; fall back to defaults.
pub fn load_config_or_default(project_root: &Path) -> PlanlockConfig {
    load_config(project_root).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable config, using defaults");
        PlanlockConfig::default()
    })
}
