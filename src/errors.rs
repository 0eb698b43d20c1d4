//! Typed error definitions for scratchfs.
//! Provides a small set of well-known failure modes for better logs and tests.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScratchError {
    #[error("Invalid argument: {reason}: '{path}'")]
    InvalidArgument { path: String, reason: &'static str },

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Path is, or contains, the current working directory: {0}")]
    CwdConflict(PathBuf),

    #[error("Permission denied on {path}: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Resource busy (held by another handle): {0}")]
    ResourceBusy(PathBuf),

    #[error("Gave up allocating a unique name under {root} after {attempts} attempts")]
    ResourceExhausted { root: PathBuf, attempts: u32 },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Failed to delete {0}: still present after all removal strategies")]
    DeleteFailed(PathBuf),

    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScratchError {
    /// Build an `InvalidArgument` for a path-like argument.
    pub(crate) fn invalid(path: impl Into<String>, reason: &'static str) -> Self {
        ScratchError::InvalidArgument {
            path: path.into(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScratchError>;
