//! Collaborator error types

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by an operation's collaborator
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Invalid command line: {0}")]
    InvalidCommand(String),

    #[error("No input matches '{0}'")]
    MissingInput(String),

    #[error("Input '{pattern}' is ambiguous ({count} matches)")]
    AmbiguousInput { pattern: String, count: usize },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Refusing to remove {0} outside the working directory without force")]
    Refused(PathBuf),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Dependency manifest error: {0}")]
    Manifest(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Could not open browser for '{url}': {reason}")]
    Browser { url: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CollaboratorError {
    /// Adapter for `map_err` that records the path an I/O error occurred on
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| CollaboratorError::Io { path, source }
    }
}
