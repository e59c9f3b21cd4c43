use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_APP_NAME: &str = "Adobe Photoshop 2025";

/// Largest accepted `--delay-scale`. Beyond this a run would mostly be sleeping.
pub const MAX_DELAY_SCALE: f64 = 100.0;

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about = "Remove backgrounds from a folder of images by scripting an external editor",
    long_about = None
)]
pub struct Config {
    /// Folder with the source images. Prompted for when omitted.
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Folder that receives the trimmed PNGs. Prompted for when omitted.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Name of the editor application to script.
    #[arg(long, default_value = DEFAULT_APP_NAME)]
    pub app_name: String,

    /// Do not ask for confirmation before processing.
    #[arg(short, long)]
    pub yes: bool,

    /// Do not wait for the accessibility permission reminder.
    #[arg(long)]
    pub skip_permission_check: bool,

    /// Multiplier applied to every settle delay, from 0 to 100. 0 disables waiting.
    #[arg(long, default_value_t = 1.0, value_parser = check_delay_scale)]
    pub delay_scale: f64,

    /// Require the exported file to decode as a PNG, not just exist.
    #[arg(long)]
    pub verify_png: bool,

    /// Logging level (error, warn, info, debug, trace). Falls back to
    /// `BATCH_CUTOUT_LOG`, then `warn`.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<Level>,
}

impl Config {
    pub fn settle_timings(&self) -> SettleTimings {
        SettleTimings::default().scaled(self.delay_scale)
    }
}

/// Fixed waits inserted after each dispatch.
///
/// These are heuristic upper bounds on how long the editor needs to finish its own
/// asynchronous work. Too short and a step silently does nothing; too long only
/// costs wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTimings {
    pub app_launch: Duration,
    pub open: Duration,
    pub normalize_background: Duration,
    /// AI subject selection is by far the slowest step.
    pub select_subject: Duration,
    pub invert_selection: Duration,
    pub delete_selection: Duration,
    pub deselect: Duration,
    pub trim: Duration,
    pub export: Duration,
    pub close: Duration,
    pub inter_task: Duration,
}

impl Default for SettleTimings {
    fn default() -> Self {
        Self {
            app_launch: Duration::from_secs(3),
            open: Duration::from_secs(2),
            normalize_background: Duration::from_millis(500),
            select_subject: Duration::from_secs(2),
            invert_selection: Duration::from_millis(500),
            delete_selection: Duration::from_millis(500),
            deselect: Duration::from_millis(500),
            trim: Duration::from_secs(1),
            export: Duration::from_secs(1),
            close: Duration::ZERO,
            inter_task: Duration::from_millis(500),
        }
    }
}

impl SettleTimings {
    pub const fn zero() -> Self {
        Self {
            app_launch: Duration::ZERO,
            open: Duration::ZERO,
            normalize_background: Duration::ZERO,
            select_subject: Duration::ZERO,
            invert_selection: Duration::ZERO,
            delete_selection: Duration::ZERO,
            deselect: Duration::ZERO,
            trim: Duration::ZERO,
            export: Duration::ZERO,
            close: Duration::ZERO,
            inter_task: Duration::ZERO,
        }
    }

    /// Multiply every delay by `factor`. Results that do not fit a `Duration`
    /// saturate at `Duration::MAX`; negative or NaN factors give zero.
    pub fn scaled(self, factor: f64) -> Self {
        let scale = |d: Duration| {
            Duration::try_from_secs_f64(d.as_secs_f64() * factor).unwrap_or(if factor > 0.0 {
                Duration::MAX
            } else {
                Duration::ZERO
            })
        };
        Self {
            app_launch: scale(self.app_launch),
            open: scale(self.open),
            normalize_background: scale(self.normalize_background),
            select_subject: scale(self.select_subject),
            invert_selection: scale(self.invert_selection),
            delete_selection: scale(self.delete_selection),
            deselect: scale(self.deselect),
            trim: scale(self.trim),
            export: scale(self.export),
            close: scale(self.close),
            inter_task: scale(self.inter_task),
        }
    }
}

fn check_delay_scale(s: &str) -> Result<f64, String> {
    let factor: f64 = s
        .parse()
        .map_err(|_| format!("{} is not a number", s))?;
    if !factor.is_finite() || !(0.0..=MAX_DELAY_SCALE).contains(&factor) {
        return Err(format!(
            "{} is not a valid delay scale. Use a number from 0 to {}",
            s, MAX_DELAY_SCALE
        ));
    }
    Ok(factor)
}
