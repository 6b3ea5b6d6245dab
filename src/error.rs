//! Error types for the parsers and the repository handle.
//!
//! Parsing failures and process-start failures are kept apart: a
//! [`ParseError`] is always the caller's input, an [`ExecutionError`] means
//! the git process never ran. A non-zero exit status is neither; it is
//! reported in [`crate::exec::CommandOutput`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed or unrecognized input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A recognized global option that takes a value was the last token.
    #[error("global option '{flag}' requires a value")]
    MissingValue { flag: String },

    /// No sub-command followed the global options.
    #[error("no git sub-command given")]
    MissingCommand,

    /// The string matches none of the recognized remote URL shapes.
    #[error("invalid git url '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    /// A URL without a host cannot be rendered as a hosted remote.
    #[error("git url '{url}' has no host")]
    NoHost { url: String },

    /// A line that is not in `git ls-tree` output format.
    #[error("invalid tree item '{line}'")]
    InvalidTreeItem { line: String },
}

impl ParseError {
    pub(crate) fn invalid_url(input: &str, reason: impl Into<String>) -> Self {
        ParseError::InvalidUrl {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// The external program could not be started or talked to.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("git executable '{}' not found", program.display())]
    NotFound {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("i/o error while running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("empty command line")]
    EmptyCommand,
}

/// Errors from [`crate::git::Git`] operations.
#[derive(Debug, Error)]
pub enum GitError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A git call that must succeed exited with a non-zero status.
    #[error("'{command}' exited with status {code}: {stderr}")]
    Command {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The operation was called with arguments git would reject.
    #[error("{0}")]
    Usage(String),
}

pub type Result<T, E = GitError> = std::result::Result<T, E>;
