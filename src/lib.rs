pub mod batch;
pub mod config;
pub mod errors;
pub mod logging;
pub mod osascript;
pub mod pipeline;
pub mod prompt;
pub mod reporter;
pub mod sequencer;
pub mod task;
pub mod traits;

pub mod mocks;

pub use batch::{BatchOrchestrator, BatchPlan, BatchRun, OutputCheck, RunState};
pub use config::{Config, SettleTimings};
pub use errors::{BatchError, Result};
pub use osascript::OsaScriptEditor;
pub use pipeline::Pipeline;
pub use sequencer::Sequencer;
pub use task::{FailureKind, ImageTask, TaskStatus};
pub use traits::*;
