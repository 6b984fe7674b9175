//! Error types for templates.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while resolving templates.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template parse error in {template:?}: {message}")]
    Parse { template: String, message: String },

    #[error("Template execution error in {template:?}: {message}")]
    Execute { template: String, message: String },

    #[error("Failed to load environment file {path}: {message}")]
    EnvironmentFile { path: PathBuf, message: String },
}

impl TemplateError {
    pub(crate) fn parse(template: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            template: template.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn execute(template: &str, message: impl Into<String>) -> Self {
        Self::Execute {
            template: template.to_string(),
            message: message.into(),
        }
    }
}
