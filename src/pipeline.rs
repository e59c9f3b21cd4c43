use std::time::Duration;

use crate::config::SettleTimings;
use crate::errors::{BatchError, Result};
use crate::task::ImageTask;
use crate::traits::EditorCommand;

/// Command shape stored in a step; resolved against a task before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTemplate {
    NormalizeBackgroundLayer,
    SelectSubject,
    InvertSelection,
    DeleteSelection,
    Deselect,
    Trim,
    /// Export to the task's output path.
    ExportPng,
}

impl CommandTemplate {
    pub fn resolve(self, task: &ImageTask) -> EditorCommand {
        match self {
            Self::NormalizeBackgroundLayer => EditorCommand::NormalizeBackgroundLayer,
            Self::SelectSubject => EditorCommand::SelectSubject,
            Self::InvertSelection => EditorCommand::InvertSelection,
            Self::DeleteSelection => EditorCommand::DeleteSelection,
            Self::Deselect => EditorCommand::Deselect,
            Self::Trim => EditorCommand::Trim,
            Self::ExportPng => EditorCommand::ExportPng {
                destination: task.output_path.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Open,
    Command(CommandTemplate),
    Close { saving_changes: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStep {
    pub name: &'static str,
    pub action: StepAction,
    pub settle_delay: Duration,
    /// Whether this step leaves something on disk that can be checked afterwards.
    pub verified: bool,
}

impl PipelineStep {
    const fn new(name: &'static str, action: StepAction, settle_delay: Duration) -> Self {
        Self {
            name,
            action,
            settle_delay,
            verified: false,
        }
    }

    const fn command(name: &'static str, template: CommandTemplate, settle: Duration) -> Self {
        Self::new(name, StepAction::Command(template), settle)
    }
}

/// Ordered, immutable list of steps applied to every task of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    /// Check the shape of a custom step list.
    ///
    /// The list must open first and close last so the document session is always
    /// released, and it must have exactly one verified step, the PNG export.
    pub fn new(steps: Vec<PipelineStep>) -> Result<Self> {
        let invalid = |message: &str| BatchError::Configuration {
            message: format!("invalid pipeline: {message}"),
        };

        match steps.first().map(|s| s.action) {
            Some(StepAction::Open) => {}
            Some(_) => return Err(invalid("the first step must open the document")),
            None => return Err(invalid("no steps")),
        }
        if !matches!(steps.last().map(|s| s.action), Some(StepAction::Close { .. })) {
            return Err(invalid("the last step must close the document"));
        }

        let opens = steps
            .iter()
            .filter(|s| s.action == StepAction::Open)
            .count();
        let closes = steps
            .iter()
            .filter(|s| matches!(s.action, StepAction::Close { .. }))
            .count();
        if opens != 1 || closes != 1 {
            return Err(invalid("the document must be opened and closed exactly once"));
        }

        let mut verified = steps.iter().filter(|s| s.verified);
        match (verified.next(), verified.next()) {
            (Some(step), None)
                if step.action == StepAction::Command(CommandTemplate::ExportPng) => {}
            (Some(_), None) => return Err(invalid("only the PNG export can be verified")),
            _ => return Err(invalid("exactly one step must be verified")),
        }

        Ok(Self { steps })
    }

    /// The nine-step background removal sequence.
    pub fn standard(timings: &SettleTimings) -> Self {
        use CommandTemplate::*;

        let steps = vec![
            PipelineStep::new("OpenFile", StepAction::Open, timings.open),
            PipelineStep::command(
                "NormalizeBackgroundLayer",
                NormalizeBackgroundLayer,
                timings.normalize_background,
            ),
            PipelineStep::command("SelectSubject", SelectSubject, timings.select_subject),
            PipelineStep::command("InvertSelection", InvertSelection, timings.invert_selection),
            PipelineStep::command("DeleteSelection", DeleteSelection, timings.delete_selection),
            PipelineStep::command("Deselect", Deselect, timings.deselect),
            PipelineStep::command("Trim", Trim, timings.trim),
            PipelineStep {
                verified: true,
                ..PipelineStep::command("ExportAsPNG", ExportPng, timings.export)
            },
            PipelineStep::new(
                "CloseWithoutSaving",
                StepAction::Close {
                    saving_changes: false,
                },
                timings.close,
            ),
        ];

        Self { steps }
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn verified_step(&self) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.verified)
    }

    /// Sum of all settle delays for one task.
    pub fn total_settle(&self) -> Duration {
        self.steps.iter().map(|s| s.settle_delay).sum()
    }
}
