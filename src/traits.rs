use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::Result;

/// One scripted editing command, sent to the document that is currently open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    /// Turn a locked background layer into a normal layer, if there is one.
    NormalizeBackgroundLayer,
    SelectSubject,
    InvertSelection,
    DeleteSelection,
    Deselect,
    /// Trim transparent pixels with the editor's default settings.
    Trim,
    /// Save a PNG copy of the document without changing the open document.
    ExportPng { destination: PathBuf },
}

impl EditorCommand {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NormalizeBackgroundLayer => "normalize background layer",
            Self::SelectSubject => "select subject",
            Self::InvertSelection => "invert selection",
            Self::DeleteSelection => "delete selection",
            Self::Deselect => "deselect",
            Self::Trim => "trim",
            Self::ExportPng { .. } => "export png",
        }
    }
}

/// Capability interface to a single-instance external editor.
///
/// The editor never acknowledges anything. Every method only reports whether the
/// dispatch itself worked:
///
/// - `Ok(true)`: the command was handed to the editor. It may still be running, or
///   may have had no effect at all.
/// - `Ok(false)`: the dispatch mechanism reported a failure for this one command.
/// - `Err(_)`: the port could not dispatch at all. Callers treat this as a fault of
///   the current task.
///
/// A successful return is never a completion guarantee. The only way to learn whether
/// a task worked is to look for the exported file afterwards.
pub trait EditorPort {
    /// Bring the editor up before the first document is opened.
    fn activate(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn open(&mut self, path: &Path) -> Result<bool>;

    fn issue(&mut self, command: &EditorCommand) -> Result<bool>;

    /// Close the currently open document.
    fn close(&mut self, saving_changes: bool) -> Result<bool>;
}

/// Blocking wait used in place of an acknowledgment from the editor.
pub trait Settle {
    fn settle(&self, delay: Duration);
}

/// Production settle: blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Settle for ThreadSleep {
    fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
