use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use batch_cutout::reporter::{ConsoleReporter, Reporter};
use batch_cutout::{
    logging, prompt, BatchError, BatchOrchestrator, Config, OsaScriptEditor, OutputCheck,
    Pipeline, Sequencer, ThreadSleep,
};

const EXIT_FATAL: u8 = 1;
const EXIT_PARTIAL_FAILURE: u8 = 2;

fn main() -> ExitCode {
    let config = Config::parse();
    if let Err(err) = logging::init_logging(config.log_level) {
        eprintln!("batch-cutout error: {err:?}");
        return ExitCode::from(EXIT_FATAL);
    }

    match run(config) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("❌ {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(config: Config) -> Result<ExitCode> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    println!("=== Batch Background Removal ===");
    println!("Saves trimmed PNGs directly, without dialogs\n");

    let input_dir = folder_arg(config.input_dir.clone(), &mut input, &mut output, "input")?;
    let output_dir = folder_arg(config.output_dir.clone(), &mut input, &mut output, "output")?;

    let timings = config.settle_timings();
    let sequencer = Sequencer::new(Pipeline::standard(&timings), ThreadSleep);
    let output_check = if config.verify_png {
        OutputCheck::DecodablePng
    } else {
        OutputCheck::Exists
    };
    let mut orchestrator =
        BatchOrchestrator::new(OsaScriptEditor::new(&config.app_name), sequencer, &timings)
            .with_output_check(output_check);
    let mut reporter = ConsoleReporter::new();

    let plan = match orchestrator.discover(&input_dir, &output_dir) {
        Ok(plan) => plan,
        Err(e) => return stopped_before_loop(e),
    };
    reporter.preview(&plan);

    let approved = config.yes || prompt::confirm(&mut input, &mut output, "Proceed?")?;
    if let Err(e) = orchestrator.confirm(approved) {
        return stopped_before_loop(e);
    }

    if !config.skip_permission_check {
        prompt::accessibility_gate(&mut input, &mut output)?;
    }

    println!("\n🚀 Processing images with {}...", config.app_name);
    println!("{}", "-".repeat(50));
    let run = orchestrator.run(plan, &mut reporter)?;
    reporter.summary(&run, &output_dir);

    if run.has_failures() {
        Ok(ExitCode::from(EXIT_PARTIAL_FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Report a run that ended before the first task. Anything else is fatal.
fn stopped_before_loop(err: BatchError) -> Result<ExitCode> {
    match pre_loop_exit_code(&err) {
        Some(code) => {
            if matches!(err, BatchError::UserDeclined) {
                println!("Cancelled.");
            } else {
                println!("❌ {err}");
            }
            Ok(ExitCode::from(code))
        }
        None => Err(err.into()),
    }
}

/// Declining is a normal way out; a missing or empty folder is not.
fn pre_loop_exit_code(err: &BatchError) -> Option<u8> {
    if !err.is_pre_loop() {
        return None;
    }
    match err {
        BatchError::UserDeclined => Some(0),
        _ => Some(EXIT_FATAL),
    }
}

fn folder_arg<R: BufRead, W: Write>(
    arg: Option<PathBuf>,
    input: &mut R,
    output: &mut W,
    label: &str,
) -> Result<PathBuf> {
    match arg {
        Some(path) => Ok(path),
        None => prompt::folder(input, output, label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_loop_exit_codes() {
        assert_eq!(pre_loop_exit_code(&BatchError::UserDeclined), Some(0));
        assert_eq!(
            pre_loop_exit_code(&BatchError::NoFilesFound {
                path: PathBuf::from("/in")
            }),
            Some(EXIT_FATAL)
        );
        assert_eq!(
            pre_loop_exit_code(&BatchError::FolderMissing {
                path: PathBuf::from("/nope")
            }),
            Some(EXIT_FATAL)
        );
        assert_eq!(
            pre_loop_exit_code(&BatchError::InvalidState {
                operation: "run",
                state: "idle"
            }),
            None
        );
    }
}
