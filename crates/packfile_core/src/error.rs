//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while compiling or executing a packfile.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid pack reference {reference:?} in release {release}: expected registry://<registry>/<pack>")]
    InvalidPackReference { release: String, reference: String },

    #[error("Registry {registry} not found (referenced by release {release})")]
    RegistryNotFound { release: String, registry: String },

    #[error("Template error in release {release} ({field}): {source}")]
    Template {
        release: String,
        field: String,
        #[source]
        source: packfile_templates::TemplateError,
    },

    #[error("Environment file error in release {release}: {source}")]
    EnvironmentFile {
        release: String,
        #[source]
        source: packfile_templates::TemplateError,
    },

    #[error("Packfile has not been compiled")]
    NotCompiled,

    #[error("Execution error: {0}")]
    Execution(#[from] packfile_runner::RunnerError),

    #[error("Spec error: {0}")]
    Spec(#[from] packfile_spec::SpecError),
}

impl CoreError {
    /// Check whether this error comes from the packfile contents
    /// rather than from templating or execution.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPackReference { .. } | Self::RegistryNotFound { .. } | Self::Spec(_)
        )
    }

    /// Check whether this error comes from template resolution.
    pub fn is_template_error(&self) -> bool {
        matches!(self, Self::Template { .. } | Self::EnvironmentFile { .. })
    }
}
