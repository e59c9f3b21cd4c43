use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{BatchError, Result};

/// Extensions accepted as input, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "tif", "tiff", "bmp"];

/// Lifecycle of one input image. `Pending` moves to exactly one final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Skipped,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub const fn is_final(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Console marker used by the reporter.
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Pending => "🔄",
            Self::Skipped => "⏭️",
            Self::Succeeded => "✅",
            Self::Failed => "❌",
        }
    }
}

/// Why a task ended up `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// A fault was raised while the pipeline was running.
    SequenceFault { message: String },
    /// The pipeline ran to completion but no artifact was exported.
    MissingOutput,
    /// An artifact exists but did not pass content validation.
    InvalidOutput { message: String },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequenceFault { message } => write!(f, "pipeline fault: {message}"),
            Self::MissingOutput => write!(f, "no output was exported"),
            Self::InvalidOutput { message } => write!(f, "invalid output: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    status: TaskStatus,
    failure: Option<FailureKind>,
}

impl ImageTask {
    pub fn new(input_path: PathBuf, output_dir: &Path) -> Self {
        let output_path = output_path_for(&input_path, output_dir);
        Self {
            input_path,
            output_path,
            status: TaskStatus::Pending,
            failure: None,
        }
    }

    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    pub const fn failure(&self) -> Option<&FailureKind> {
        self.failure.as_ref()
    }

    /// File name of the input, for display.
    pub fn display_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_path.display().to_string())
    }

    pub fn mark_skipped(&mut self) -> Result<()> {
        self.transition(TaskStatus::Skipped)
    }

    pub fn mark_succeeded(&mut self) -> Result<()> {
        self.transition(TaskStatus::Succeeded)
    }

    pub fn mark_failed(&mut self, kind: FailureKind) -> Result<()> {
        self.transition(TaskStatus::Failed)?;
        self.failure = Some(kind);
        Ok(())
    }

    fn transition(&mut self, to: TaskStatus) -> Result<()> {
        if self.status.is_final() || !to.is_final() {
            return Err(BatchError::StatusTransition {
                path: self.input_path.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// `<stem>.png` inside `output_dir`, whatever the source extension was.
pub fn output_path_for(input_path: &Path, output_dir: &Path) -> PathBuf {
    let mut name: OsString = input_path
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    name.push(".png");
    output_dir.join(name)
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
