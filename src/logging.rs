//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Level priority:
//! 1. `--log-level` CLI flag
//! 2. `BATCH_CUTOUT_LOG` environment variable (e.g. "info", "debug")
//! 3. `warn`, so the console reporter output stays readable
//!
//! Events go to stderr; progress and results go to stdout.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::fmt;

pub const LOG_ENV: &str = "BATCH_CUTOUT_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<Level>) -> Result<()> {
    let env_level = std::env::var(LOG_ENV).ok();
    let level = resolve_level(cli_level, env_level.as_deref());

    fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("initialising logging: {e}"))
}

/// Pick the effective level. An unparsable environment value is ignored.
pub fn resolve_level(cli_level: Option<Level>, env_level: Option<&str>) -> Level {
    cli_level
        .or_else(|| env_level.and_then(|s| s.trim().parse().ok()))
        .unwrap_or(Level::WARN)
}
