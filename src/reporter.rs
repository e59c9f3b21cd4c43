use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use crate::batch::{BatchPlan, BatchRun};
use crate::task::{ImageTask, TaskStatus};

/// How many file names the preview lists before summarising the rest.
pub const PREVIEW_LIMIT: usize = 5;

/// Human-facing view of a run. Reads task status and counters only.
pub trait Reporter {
    fn preview(&mut self, plan: &BatchPlan);
    fn task_started(&mut self, position: usize, total: usize, task: &ImageTask);
    fn task_finished(&mut self, position: usize, total: usize, task: &ImageTask);
    fn summary(&mut self, run: &BatchRun, output_dir: &Path);
}

/// Reporter that prints nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn preview(&mut self, _plan: &BatchPlan) {}
    fn task_started(&mut self, _position: usize, _total: usize, _task: &ImageTask) {}
    fn task_finished(&mut self, _position: usize, _total: usize, _task: &ImageTask) {}
    fn summary(&mut self, _run: &BatchRun, _output_dir: &Path) {}
}

pub fn found_line(plan: &BatchPlan) -> String {
    format!(
        "📁 Found {} image files in {}",
        plan.len(),
        plan.input_dir.display()
    )
}

/// Preview lines: up to [`PREVIEW_LIMIT`] names, then "... and N more".
pub fn preview_lines(plan: &BatchPlan) -> Vec<String> {
    let mut lines: Vec<String> = plan
        .tasks
        .iter()
        .take(PREVIEW_LIMIT)
        .map(|task| format!("  • {}", task.display_name()))
        .collect();
    if plan.len() > PREVIEW_LIMIT {
        lines.push(format!("  ... and {} more", plan.len() - PREVIEW_LIMIT));
    }
    lines
}

/// Per-task outcome line, e.g. `[2/5] ✅ photo.jpg`.
pub fn outcome_line(position: usize, total: usize, task: &ImageTask) -> String {
    let mut line = format!(
        "[{}/{}] {} {}",
        position,
        total,
        task.status().marker(),
        task.display_name()
    );
    match task.status() {
        TaskStatus::Skipped => line.push_str(" (exists)"),
        TaskStatus::Failed => {
            if let Some(failure) = task.failure() {
                line.push_str(&format!(" ({failure})"));
            }
        }
        TaskStatus::Pending | TaskStatus::Succeeded => {}
    }
    line
}

pub fn summary_lines(run: &BatchRun, output_dir: &Path) -> Vec<String> {
    let mut lines = vec![
        "📊 Results:".to_string(),
        format!("  ✅ Processed: {}", run.processed),
        format!("  ❌ Failed: {}", run.failed),
        format!("  ⏭️  Skipped: {}", run.skipped),
        format!("  📁 Total: {}", run.total),
    ];
    if run.processed > 0 {
        lines.push(String::new());
        lines.push(format!("🎉 Output saved to: {}", output_dir.display()));
    }
    lines
}

/// Console reporter with a progress bar under the per-task lines.
#[derive(Default)]
pub struct ConsoleReporter {
    progress_bar: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar(&mut self, total: usize) -> &ProgressBar {
        self.progress_bar.get_or_insert_with(|| {
            let pb = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        })
    }
}

impl Reporter for ConsoleReporter {
    fn preview(&mut self, plan: &BatchPlan) {
        println!("\n{}", found_line(plan));
        println!("\n📋 Files to process:");
        for line in preview_lines(plan) {
            println!("{line}");
        }
    }

    fn task_started(&mut self, _position: usize, total: usize, task: &ImageTask) {
        let name = task.display_name();
        self.bar(total).set_message(name);
    }

    fn task_finished(&mut self, position: usize, total: usize, task: &ImageTask) {
        let line = outcome_line(position, total, task);
        let pb = self.bar(total);
        pb.println(line);
        pb.inc(1);
    }

    fn summary(&mut self, run: &BatchRun, output_dir: &Path) {
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_and_clear();
        }
        println!("{}", "-".repeat(50));
        for line in summary_lines(run, output_dir) {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FailureKind;
    use std::path::PathBuf;

    fn plan(count: usize) -> BatchPlan {
        let output_dir = PathBuf::from("/out");
        BatchPlan {
            input_dir: PathBuf::from("/in"),
            tasks: (0..count)
                .map(|i| ImageTask::new(PathBuf::from(format!("/in/{i}.jpg")), &output_dir))
                .collect(),
            output_dir,
        }
    }

    #[test]
    fn test_preview_truncates() {
        let lines = preview_lines(&plan(7));
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "  • 0.jpg");
        assert_eq!(lines[5], "  ... and 2 more");

        assert_eq!(preview_lines(&plan(3)).len(), 3);
    }

    #[test]
    fn test_found_line_names_input_folder() {
        assert_eq!(found_line(&plan(7)), "📁 Found 7 image files in /in");
    }

    #[test]
    fn test_outcome_lines() {
        let mut task = ImageTask::new(PathBuf::from("/in/a.jpg"), Path::new("/out"));
        task.mark_failed(FailureKind::MissingOutput).unwrap();
        assert_eq!(
            outcome_line(2, 5, &task),
            "[2/5] ❌ a.jpg (no output was exported)"
        );

        let mut task = ImageTask::new(PathBuf::from("/in/b.jpg"), Path::new("/out"));
        task.mark_skipped().unwrap();
        assert_eq!(outcome_line(1, 5, &task), "[1/5] ⏭️ b.jpg (exists)");
    }
}
