use std::path::PathBuf;
use thiserror::Error;

use crate::task::TaskStatus;

/// Structured error types for the batch cutout run.
///
/// The first three variants are the only conditions that end a whole run. Everything
/// that happens inside a single task's pipeline is caught at the task boundary and
/// recorded on the task instead (see [`crate::task::FailureKind`]).
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Input folder does not exist: {path:?}")]
    FolderMissing { path: PathBuf },

    #[error("No image files found in {path:?}")]
    NoFilesFound { path: PathBuf },

    #[error("Batch declined by user")]
    UserDeclined,

    #[error("Dispatch error: {operation} could not be sent to the editor")]
    Dispatch {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid batch state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Task {path:?} is already {from:?}, cannot become {to:?}")]
    StatusTransition {
        path: PathBuf,
        from: TaskStatus,
        to: TaskStatus,
    },
}

impl BatchError {
    /// True for the conditions that stop a run before any task is attempted.
    pub const fn is_pre_loop(&self) -> bool {
        matches!(
            self,
            Self::FolderMissing { .. } | Self::NoFilesFound { .. } | Self::UserDeclined
        )
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should build `BatchError::FileSystem`
/// itself; this is the fallback for `?` on bare I/O calls.
impl From<std::io::Error> for BatchError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}
