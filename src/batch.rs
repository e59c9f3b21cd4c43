use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::SettleTimings;
use crate::errors::{BatchError, Result};
use crate::reporter::Reporter;
use crate::sequencer::Sequencer;
use crate::task::{is_supported_image, FailureKind, ImageTask, TaskStatus};
use crate::traits::{EditorPort, Settle};

/// Post-hoc check that decides whether a task succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputCheck {
    /// The exported file exists.
    #[default]
    Exists,
    /// The exported file exists and its header decodes as a non-empty PNG.
    DecodablePng,
}

impl OutputCheck {
    pub fn verify(self, output_path: &Path) -> std::result::Result<(), FailureKind> {
        if !output_path.is_file() {
            return Err(FailureKind::MissingOutput);
        }
        match self {
            Self::Exists => Ok(()),
            Self::DecodablePng => {
                let format = image::ImageFormat::from_path(output_path).ok();
                if format != Some(image::ImageFormat::Png) {
                    return Err(FailureKind::InvalidOutput {
                        message: "output does not have a .png extension".to_string(),
                    });
                }
                match image::image_dimensions(output_path) {
                    Ok((w, h)) if w > 0 && h > 0 => Ok(()),
                    Ok((w, h)) => Err(FailureKind::InvalidOutput {
                        message: format!("empty image ({w}x{h})"),
                    }),
                    Err(e) => Err(FailureKind::InvalidOutput {
                        message: e.to_string(),
                    }),
                }
            }
        }
    }
}

/// Files found in the input folder, ready to be confirmed and run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub tasks: Vec<ImageTask>,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Counters and tasks of one invocation. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRun {
    pub tasks: Vec<ImageTask>,
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
}

impl BatchRun {
    fn new(total: usize) -> Self {
        Self {
            tasks: Vec::with_capacity(total),
            processed: 0,
            failed: 0,
            skipped: 0,
            total,
        }
    }

    fn record(&mut self, task: ImageTask) {
        match task.status() {
            TaskStatus::Succeeded => self.processed += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Skipped => self.skipped += 1,
            TaskStatus::Pending => {}
        }
        self.tasks.push(task);
    }

    pub const fn is_conserved(&self) -> bool {
        self.processed + self.failed + self.skipped == self.total
    }

    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Confirmed,
    Running,
    Completed,
    Aborted,
}

impl RunState {
    const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Confirmed => "confirmed",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

/// List supported images directly inside `input_dir`, sorted by file name.
pub fn discover_images(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| BatchError::FileSystem {
            path: input_dir.to_path_buf(),
            operation: "list input folder".to_string(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    Ok(images)
}

/// Drives one batch: discovery, confirmation, then one task at a time.
///
/// Only one task ever has a document open in the editor. Faults inside a task are
/// recorded on that task and the loop moves on.
pub struct BatchOrchestrator<P: EditorPort, S: Settle> {
    port: P,
    sequencer: Sequencer<S>,
    inter_task: Duration,
    app_launch: Duration,
    output_check: OutputCheck,
    state: RunState,
    editor_ready: bool,
}

impl<P: EditorPort, S: Settle> BatchOrchestrator<P, S> {
    pub fn new(port: P, sequencer: Sequencer<S>, timings: &SettleTimings) -> Self {
        Self {
            port,
            sequencer,
            inter_task: timings.inter_task,
            app_launch: timings.app_launch,
            output_check: OutputCheck::default(),
            state: RunState::Idle,
            editor_ready: false,
        }
    }

    pub fn with_output_check(mut self, check: OutputCheck) -> Self {
        self.output_check = check;
        self
    }

    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Find the images to process. Aborts the run when the folder is missing or empty.
    pub fn discover(&mut self, input_dir: &Path, output_dir: &Path) -> Result<BatchPlan> {
        self.expect_state(RunState::Idle, "discover")?;

        if !input_dir.is_dir() {
            self.state = RunState::Aborted;
            return Err(BatchError::FolderMissing {
                path: input_dir.to_path_buf(),
            });
        }

        let images = match discover_images(input_dir) {
            Ok(images) => images,
            Err(e) => {
                self.state = RunState::Aborted;
                return Err(e);
            }
        };
        if images.is_empty() {
            self.state = RunState::Aborted;
            return Err(BatchError::NoFilesFound {
                path: input_dir.to_path_buf(),
            });
        }

        info!(count = images.len(), input = %input_dir.display(), "discovered images");
        let tasks = images
            .into_iter()
            .map(|path| ImageTask::new(path, output_dir))
            .collect();

        Ok(BatchPlan {
            input_dir: input_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            tasks,
        })
    }

    /// Record the user's answer to the confirmation prompt.
    pub fn confirm(&mut self, approved: bool) -> Result<()> {
        self.expect_state(RunState::Idle, "confirm")?;
        if approved {
            self.state = RunState::Confirmed;
            Ok(())
        } else {
            self.state = RunState::Aborted;
            Err(BatchError::UserDeclined)
        }
    }

    /// Process every task of `plan` in order.
    pub fn run<R: Reporter + ?Sized>(
        &mut self,
        plan: BatchPlan,
        reporter: &mut R,
    ) -> Result<BatchRun> {
        self.expect_state(RunState::Confirmed, "run")?;

        fs::create_dir_all(&plan.output_dir).map_err(|e| BatchError::FileSystem {
            path: plan.output_dir.clone(),
            operation: "create output folder".to_string(),
            source: e,
        })?;

        self.state = RunState::Running;
        let total = plan.tasks.len();
        let mut run = BatchRun::new(total);

        for (index, mut task) in plan.tasks.into_iter().enumerate() {
            let position = index + 1;
            reporter.task_started(position, total, &task);

            self.process_task(&mut task)?;
            reporter.task_finished(position, total, &task);
            run.record(task);

            self.sequencer.settle().settle(self.inter_task);
        }

        self.state = RunState::Completed;
        info!(
            processed = run.processed,
            failed = run.failed,
            skipped = run.skipped,
            total = run.total,
            "batch completed"
        );
        Ok(run)
    }

    fn process_task(&mut self, task: &mut ImageTask) -> Result<()> {
        if task.output_path.exists() {
            debug!(file = %task.display_name(), "output exists, skipping");
            return task.mark_skipped();
        }

        if let Err(e) = self.ensure_editor_ready() {
            error!(file = %task.display_name(), error = %e, "editor could not be activated");
            return task.mark_failed(FailureKind::SequenceFault {
                message: e.to_string(),
            });
        }

        let report = match self.sequencer.run(&mut self.port, task) {
            Ok(report) => report,
            Err(e) => {
                error!(file = %task.display_name(), error = %e, "pipeline fault");
                return task.mark_failed(FailureKind::SequenceFault {
                    message: e.to_string(),
                });
            }
        };

        match self.output_check.verify(&task.output_path) {
            Ok(()) => {
                info!(file = %task.display_name(), output = %task.output_path.display(), "processed");
                task.mark_succeeded()
            }
            Err(kind) => {
                warn!(
                    file = %task.display_name(),
                    reason = %kind,
                    export_dispatched = report.artifact_dispatched(),
                    "output check failed"
                );
                task.mark_failed(kind)
            }
        }
    }

    /// Activate the editor once, before the first task that needs it.
    fn ensure_editor_ready(&mut self) -> Result<()> {
        if self.editor_ready {
            return Ok(());
        }
        if !self.port.activate()? {
            warn!("editor activation dispatch failed, continuing");
        }
        self.sequencer.settle().settle(self.app_launch);
        self.editor_ready = true;
        Ok(())
    }

    fn expect_state(&self, expected: RunState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(BatchError::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{ExportBehavior, MockEditor, PortCall, RecordingSettle};
    use crate::pipeline::Pipeline;
    use crate::reporter::NullReporter;
    use tempfile::TempDir;

    fn orchestrator(
        editor: MockEditor,
        timings: SettleTimings,
    ) -> BatchOrchestrator<MockEditor, RecordingSettle> {
        let sequencer = Sequencer::new(Pipeline::standard(&timings), RecordingSettle::new());
        BatchOrchestrator::new(editor, sequencer, &timings)
    }

    fn folders() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input");
        let output = temp_dir.path().join("output");
        fs::create_dir_all(&input).unwrap();
        (temp_dir, input, output)
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let (_tmp, input, _output) = folders();
        for name in ["c.PNG", "a.jpg", "b.txt", "d.tiff"] {
            fs::write(input.join(name), b"x").unwrap();
        }
        fs::create_dir_all(input.join("nested.jpg")).unwrap();
        fs::create_dir_all(input.join("sub")).unwrap();
        fs::write(input.join("sub").join("deep.jpg"), b"x").unwrap();

        let names: Vec<_> = discover_images(&input)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "c.PNG", "d.tiff"]);
    }

    #[test]
    fn test_missing_folder_aborts() {
        let (_tmp, input, output) = folders();
        let editor = MockEditor::new();
        let mut batch = orchestrator(editor.clone(), SettleTimings::zero());

        let err = batch.discover(&input.join("nope"), &output).unwrap_err();

        assert!(matches!(err, BatchError::FolderMissing { .. }));
        assert_eq!(batch.state(), RunState::Aborted);
        assert_eq!(editor.call_count(), 0);
        assert!(!output.exists());
    }

    #[test]
    fn test_empty_folder_aborts() {
        let (_tmp, input, output) = folders();
        fs::write(input.join("notes.txt"), b"x").unwrap();
        let mut batch = orchestrator(MockEditor::new(), SettleTimings::zero());

        let err = batch.discover(&input, &output).unwrap_err();
        assert!(matches!(err, BatchError::NoFilesFound { .. }));
        assert_eq!(batch.state(), RunState::Aborted);
    }

    #[test]
    fn test_decline_aborts_before_run() {
        let (_tmp, input, output) = folders();
        fs::write(input.join("a.jpg"), b"x").unwrap();
        let editor = MockEditor::new();
        let mut batch = orchestrator(editor.clone(), SettleTimings::zero());

        let plan = batch.discover(&input, &output).unwrap();
        assert!(matches!(batch.confirm(false), Err(BatchError::UserDeclined)));
        assert!(matches!(
            batch.run(plan, &mut NullReporter),
            Err(BatchError::InvalidState { .. })
        ));
        assert_eq!(editor.call_count(), 0);
    }

    #[test]
    fn test_run_requires_confirmation() {
        let (_tmp, input, output) = folders();
        fs::write(input.join("a.jpg"), b"x").unwrap();
        let mut batch = orchestrator(MockEditor::new(), SettleTimings::zero());

        let plan = batch.discover(&input, &output).unwrap();
        assert!(batch.run(plan, &mut NullReporter).is_err());
        assert_eq!(batch.state(), RunState::Idle);
    }

    #[test]
    fn test_classifies_each_outcome() {
        let (_tmp, input, output) = folders();
        for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
            fs::write(input.join(name), b"x").unwrap();
        }
        fs::create_dir_all(&output).unwrap();
        fs::write(output.join("d.png"), b"done").unwrap();

        let editor = MockEditor::new()
            .with_export(ExportBehavior::WritePng)
            .raise_for("b.jpg")
            .silent_export_for("c.jpg");
        let mut batch = orchestrator(editor.clone(), SettleTimings::zero());

        let plan = batch.discover(&input, &output).unwrap();
        batch.confirm(true).unwrap();
        let run = batch.run(plan, &mut NullReporter).unwrap();

        let statuses: Vec<_> = run.tasks.iter().map(|t| t.status()).collect();
        assert_eq!(
            statuses,
            vec![
                TaskStatus::Succeeded,
                TaskStatus::Failed,
                TaskStatus::Failed,
                TaskStatus::Skipped
            ]
        );
        assert!(matches!(
            run.tasks[1].failure(),
            Some(FailureKind::SequenceFault { .. })
        ));
        assert_eq!(run.tasks[2].failure(), Some(&FailureKind::MissingOutput));
        assert_eq!((run.processed, run.failed, run.skipped, run.total), (1, 2, 1, 4));
        assert!(run.is_conserved());
        assert_eq!(batch.state(), RunState::Completed);
        assert!(editor.calls_for("d.jpg").is_empty());
        assert_eq!(editor.overlapping_opens(), 0);
        assert!(!editor.has_open_document());
    }

    #[test]
    fn test_activates_editor_once_and_lazily() {
        let (_tmp, input, output) = folders();
        for name in ["a.jpg", "b.jpg"] {
            fs::write(input.join(name), b"x").unwrap();
        }
        let editor = MockEditor::new().with_export(ExportBehavior::WritePng);
        let mut batch = orchestrator(editor.clone(), SettleTimings::zero());

        let plan = batch.discover(&input, &output).unwrap();
        batch.confirm(true).unwrap();
        batch.run(plan, &mut NullReporter).unwrap();

        let calls = editor.calls();
        assert_eq!(calls[0], PortCall::Activate);
        assert_eq!(
            calls.iter().filter(|c| **c == PortCall::Activate).count(),
            1
        );
    }

    #[test]
    fn test_activation_fault_fails_one_task_and_retries() {
        let (_tmp, input, output) = folders();
        for name in ["a.jpg", "b.jpg"] {
            fs::write(input.join(name), b"x").unwrap();
        }
        let editor = MockEditor::new()
            .with_export(ExportBehavior::WritePng)
            .raise_on_activate(1);
        let mut batch = orchestrator(editor.clone(), SettleTimings::zero());

        let plan = batch.discover(&input, &output).unwrap();
        batch.confirm(true).unwrap();
        let run = batch.run(plan, &mut NullReporter).unwrap();

        assert_eq!(run.tasks[0].status(), TaskStatus::Failed);
        assert!(matches!(
            run.tasks[0].failure(),
            Some(FailureKind::SequenceFault { .. })
        ));
        assert!(editor.calls_for("a.jpg").is_empty());
        assert!(!output.join("a.png").exists());

        assert_eq!(run.tasks[1].status(), TaskStatus::Succeeded);
        assert_eq!(editor.calls_for("b.jpg").len(), 9);
        assert_eq!(
            editor.calls().iter().filter(|c| **c == PortCall::Activate).count(),
            2
        );
        assert_eq!((run.processed, run.failed, run.skipped), (1, 1, 0));
        assert!(run.is_conserved());
        assert_eq!(batch.state(), RunState::Completed);
    }

    #[test]
    fn test_pauses_after_every_task() {
        let (_tmp, input, output) = folders();
        for name in ["a.jpg", "b.jpg"] {
            fs::write(input.join(name), b"x").unwrap();
        }
        fs::create_dir_all(&output).unwrap();
        fs::write(output.join("a.png"), b"done").unwrap();

        let timings = SettleTimings::default();
        let settle = RecordingSettle::new();
        let sequencer = Sequencer::new(Pipeline::standard(&timings), settle.clone());
        let editor = MockEditor::new().with_export(ExportBehavior::WritePng);
        let mut batch = BatchOrchestrator::new(editor, sequencer, &timings);

        let plan = batch.discover(&input, &output).unwrap();
        batch.confirm(true).unwrap();
        batch.run(plan, &mut NullReporter).unwrap();

        let delays = settle.delays();
        // a: skipped, pause. b: launch + 9 steps + pause.
        assert_eq!(delays.len(), 12);
        assert_eq!(delays[0], timings.inter_task);
        assert_eq!(delays[1], timings.app_launch);
        assert_eq!(delays[11], timings.inter_task);
    }

    #[test]
    fn test_decodable_png_check() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.png");
        let garbage = temp_dir.path().join("garbage.png");
        let valid = temp_dir.path().join("valid.png");
        fs::write(&garbage, b"not a png").unwrap();
        image::RgbaImage::new(2, 2).save(&valid).unwrap();

        assert_eq!(
            OutputCheck::DecodablePng.verify(&missing),
            Err(FailureKind::MissingOutput)
        );
        assert!(matches!(
            OutputCheck::DecodablePng.verify(&garbage),
            Err(FailureKind::InvalidOutput { .. })
        ));
        assert_eq!(OutputCheck::DecodablePng.verify(&valid), Ok(()));
        assert_eq!(OutputCheck::Exists.verify(&garbage), Ok(()));
    }
}
