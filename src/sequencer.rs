//! Runs the fixed step list against one document.
//!
//! The editor gives no acknowledgment, so the sequencer does not try to find out
//! whether a step "worked". It dispatches, waits the step's settle delay, and moves
//! on. A `false` dispatch result is logged and the pipeline keeps going. Whether the
//! task succeeded is decided later by looking for the exported file.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::Result;
use crate::pipeline::{Pipeline, StepAction};
use crate::task::ImageTask;
use crate::traits::{EditorCommand, EditorPort, Settle};

/// Exclusive hold on the editor's single open document.
///
/// Dropping the session without calling [`DocumentSession::close`] still closes the
/// document, without saving, so a fault part-way through a task cannot leave a
/// document open for the next one.
pub struct DocumentSession<'p, P: EditorPort> {
    port: &'p mut P,
    document: PathBuf,
    released: bool,
}

impl<'p, P: EditorPort> DocumentSession<'p, P> {
    /// Take the session for `document`. Nothing is sent to the editor yet.
    pub fn begin(port: &'p mut P, document: &Path) -> Self {
        Self {
            port,
            document: document.to_path_buf(),
            released: false,
        }
    }

    pub fn open(&mut self) -> Result<bool> {
        self.port.open(&self.document)
    }

    pub fn issue(&mut self, command: &EditorCommand) -> Result<bool> {
        self.port.issue(command)
    }

    /// Close the document. Later drops do nothing, even if this call failed.
    pub fn close(&mut self, saving_changes: bool) -> Result<bool> {
        self.released = true;
        self.port.close(saving_changes)
    }

    pub const fn is_released(&self) -> bool {
        self.released
    }
}

impl<P: EditorPort> Drop for DocumentSession<'_, P> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        warn!(document = %self.document.display(), "closing document left open by an aborted pipeline");
        match self.port.close(false) {
            Ok(true) => {}
            Ok(false) => warn!(document = %self.document.display(), "close dispatch failed"),
            Err(e) => warn!(document = %self.document.display(), error = %e, "close could not be sent"),
        }
    }
}

/// Dispatch result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: &'static str,
    pub dispatched: bool,
    pub verified: bool,
}

/// What the sequencer saw while running one task. Says nothing about the image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    pub steps: Vec<StepRecord>,
}

impl SequenceReport {
    pub fn dispatch_faults(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| !s.dispatched)
    }

    pub fn all_dispatched(&self) -> bool {
        self.steps.iter().all(|s| s.dispatched)
    }

    /// Whether the step that produces the checked artifact was handed to the editor.
    pub fn artifact_dispatched(&self) -> bool {
        self.steps.iter().any(|s| s.verified && s.dispatched)
    }
}

pub struct Sequencer<S: Settle> {
    pipeline: Pipeline,
    settle: S,
}

impl<S: Settle> Sequencer<S> {
    pub const fn new(pipeline: Pipeline, settle: S) -> Self {
        Self { pipeline, settle }
    }

    pub const fn settle(&self) -> &S {
        &self.settle
    }

    /// Run every step for `task`.
    ///
    /// Returns `Err` only when the port raised a fault; the document is closed on that
    /// path as well. `Ok` means the steps were dispatched, not that they took effect.
    pub fn run<P: EditorPort>(&self, port: &mut P, task: &ImageTask) -> Result<SequenceReport> {
        let mut session = DocumentSession::begin(port, &task.input_path);
        let mut report = SequenceReport::default();

        for step in self.pipeline.steps() {
            let dispatched = match step.action {
                StepAction::Open => session.open()?,
                StepAction::Command(template) => session.issue(&template.resolve(task))?,
                StepAction::Close { saving_changes } => session.close(saving_changes)?,
            };

            if dispatched {
                debug!(step = step.name, file = %task.display_name(), "step dispatched");
            } else {
                warn!(step = step.name, file = %task.display_name(), "step dispatch failed, continuing");
            }
            report.steps.push(StepRecord {
                name: step.name,
                dispatched,
                verified: step.verified,
            });

            self.settle.settle(step.settle_delay);
        }

        Ok(report)
    }
}
