//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while invoking nomad-pack.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("nomad-pack binary not found: {0}")]
    BinaryNotFound(String),

    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` failed with {status}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}
