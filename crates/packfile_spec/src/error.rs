//! Error types for packfile configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for configuration operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors that can occur while loading a packfile.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Packfile not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid packfile {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
