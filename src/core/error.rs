use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanlockError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Git error: {0}")]
    GitError(String),
    #[error("Timed out: {0}")]
    Timeout(String),
}
