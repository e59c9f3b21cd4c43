use std::mem::discriminant;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use crate::errors::{BatchError, Result};
use crate::traits::{EditorCommand, EditorPort, Settle};

/// One call received by [`MockEditor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortCall {
    Activate,
    Open(PathBuf),
    Issue(EditorCommand),
    Close { saving_changes: bool },
}

/// What the mock does with the file system when it receives an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportBehavior {
    /// Write nothing, like an editor that ignored the command.
    Nothing,
    /// Write a real 1x1 transparent PNG.
    WritePng,
    /// Write bytes that are not an image.
    WriteGarbage,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<PortCall>,
    current: Option<PathBuf>,
    overlapping_opens: usize,
    activation_faults: usize,
}

/// Editor double that records every call instead of driving a real application.
///
/// Clones share the call log, so a test can keep one clone and hand the other to
/// the code under test.
#[derive(Debug, Clone)]
pub struct MockEditor {
    state: Arc<Mutex<MockState>>,
    export: ExportBehavior,
    failing_opens: Vec<String>,
    raising_opens: Vec<String>,
    failing_commands: Vec<EditorCommand>,
    raising_commands: Vec<EditorCommand>,
    raising_files: Vec<String>,
    silent_exports: Vec<String>,
}

impl Default for MockEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEditor {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            export: ExportBehavior::Nothing,
            failing_opens: Vec::new(),
            raising_opens: Vec::new(),
            failing_commands: Vec::new(),
            raising_commands: Vec::new(),
            raising_files: Vec::new(),
            silent_exports: Vec::new(),
        }
    }

    pub fn with_export(mut self, behavior: ExportBehavior) -> Self {
        self.export = behavior;
        self
    }

    /// The next `times` calls to `activate` raise a fault.
    pub fn raise_on_activate(self, times: usize) -> Self {
        self.state.lock().activation_faults = times;
        self
    }

    /// `open` reports a dispatch failure for this file name.
    pub fn fail_open_for(mut self, file_name: &str) -> Self {
        self.failing_opens.push(file_name.to_string());
        self
    }

    /// `open` raises for this file name.
    pub fn raise_on_open_for(mut self, file_name: &str) -> Self {
        self.raising_opens.push(file_name.to_string());
        self
    }

    /// Every command of this kind reports a dispatch failure.
    pub fn fail_command(mut self, command: EditorCommand) -> Self {
        self.failing_commands.push(command);
        self
    }

    /// Every command of this kind raises.
    pub fn raise_on(mut self, command: EditorCommand) -> Self {
        self.raising_commands.push(command);
        self
    }

    /// Every command raises while this file is open.
    pub fn raise_for(mut self, file_name: &str) -> Self {
        self.raising_files.push(file_name.to_string());
        self
    }

    /// Export dispatches fine for this file but writes nothing.
    pub fn silent_export_for(mut self, file_name: &str) -> Self {
        self.silent_exports.push(file_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<PortCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Calls that targeted the given input file, from its `open` up to its `close`.
    pub fn calls_for(&self, file_name: &str) -> Vec<PortCall> {
        let state = self.state.lock();
        let mut current: Option<bool> = None;
        let mut out = Vec::new();
        for call in &state.calls {
            if let PortCall::Open(path) = call {
                current = Some(file_matches(path, file_name));
            }
            if current == Some(true) {
                out.push(call.clone());
            }
            if matches!(call, PortCall::Close { .. }) {
                current = None;
            }
        }
        out
    }

    /// Number of times `open` was called while another document was still open.
    pub fn overlapping_opens(&self) -> usize {
        self.state.lock().overlapping_opens
    }

    pub fn has_open_document(&self) -> bool {
        self.state.lock().current.is_some()
    }

    fn current_is_any(&self, names: &[String]) -> bool {
        let state = self.state.lock();
        state
            .current
            .as_deref()
            .map(|path| names.iter().any(|n| file_matches(path, n)))
            .unwrap_or(false)
    }

    fn raised(operation: &str) -> BatchError {
        BatchError::Dispatch {
            operation: operation.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "mock fault"),
        }
    }

    fn write_export(&self, destination: &Path) -> Result<()> {
        match self.export {
            ExportBehavior::Nothing => Ok(()),
            ExportBehavior::WritePng => RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]))
                .save(destination)
                .map_err(|e| BatchError::Configuration {
                    message: format!("mock export failed: {e}"),
                }),
            ExportBehavior::WriteGarbage => std::fs::write(destination, b"not a png").map_err(|e| {
                BatchError::FileSystem {
                    path: destination.to_path_buf(),
                    operation: "mock export".to_string(),
                    source: e,
                }
            }),
        }
    }
}

fn file_matches(path: &Path, file_name: &str) -> bool {
    path.file_name().map(|n| n == file_name).unwrap_or(false)
}

fn same_kind(a: &EditorCommand, b: &EditorCommand) -> bool {
    discriminant(a) == discriminant(b)
}

impl EditorPort for MockEditor {
    fn activate(&mut self) -> Result<bool> {
        let mut state = self.state.lock();
        state.calls.push(PortCall::Activate);
        if state.activation_faults > 0 {
            state.activation_faults -= 1;
            return Err(Self::raised("activate"));
        }
        Ok(true)
    }

    fn open(&mut self, path: &Path) -> Result<bool> {
        {
            let mut state = self.state.lock();
            state.calls.push(PortCall::Open(path.to_path_buf()));
            if state.current.is_some() {
                state.overlapping_opens += 1;
            }
            state.current = Some(path.to_path_buf());
        }

        if self.raising_opens.iter().any(|n| file_matches(path, n)) {
            return Err(Self::raised("open"));
        }
        Ok(!self.failing_opens.iter().any(|n| file_matches(path, n)))
    }

    fn issue(&mut self, command: &EditorCommand) -> Result<bool> {
        self.state.lock().calls.push(PortCall::Issue(command.clone()));

        if self.current_is_any(&self.raising_files)
            || self.raising_commands.iter().any(|c| same_kind(c, command))
        {
            return Err(Self::raised(command.name()));
        }
        if self.failing_commands.iter().any(|c| same_kind(c, command)) {
            return Ok(false);
        }

        if let EditorCommand::ExportPng { destination } = command {
            if !self.current_is_any(&self.silent_exports) {
                self.write_export(destination)?;
            }
        }
        Ok(true)
    }

    fn close(&mut self, saving_changes: bool) -> Result<bool> {
        let mut state = self.state.lock();
        state.calls.push(PortCall::Close { saving_changes });
        state.current = None;
        Ok(true)
    }
}

/// Settle double that records requested delays and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct RecordingSettle {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSettle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    pub fn total(&self) -> Duration {
        self.delays.lock().iter().sum()
    }
}

impl Settle for RecordingSettle {
    fn settle(&self, delay: Duration) {
        self.delays.lock().push(delay);
    }
}
