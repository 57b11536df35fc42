//! Probe error taxonomy.
//!
//! None of these escape a handler: they are converted to "unavailable" or an
//! absent revision at the handler boundary.

use std::path::PathBuf;

/// Errors raised while probing a source-control system.
#[derive(Debug, thiserror::Error)]
pub enum ScmError {
    #[error("{tool} is not installed or not in PATH")]
    ToolNotFound { tool: String },

    #[error("{tool} {args} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        args: String,
        status: String,
        stderr: String,
    },

    #[error("not a repository: {0}")]
    NotARepository(PathBuf),

    #[error("no revision: {0}")]
    NoRevision(String),

    #[error("malformed output: {0}")]
    MalformedOutput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScmError {
    /// Expected absence (tool missing, no repository, unborn branch) as opposed
    /// to an unexpected fault such as unparseable metadata.
    pub fn is_routine(&self) -> bool {
        !matches!(self, ScmError::MalformedOutput(_))
    }
}

/// Result type for probe operations.
pub type Result<T> = std::result::Result<T, ScmError>;
