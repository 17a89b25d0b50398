//! CLI output formatting

use crate::core::{ExecutionStatus, Operation};
use crate::execution::ExecutionEvent;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static EYES: Emoji<'_, '_> = Emoji("👀 ", "* ");

/// Create a spinner for a running operation
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

pub fn format_elapsed(elapsed_ms: u128) -> String {
    if elapsed_ms < 1000 {
        format!("{}ms", elapsed_ms)
    } else {
        format!("{:.1}s", elapsed_ms as f64 / 1000.0)
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            name,
            total,
        } => format!(
            "{} Running {} ({} operations, {})",
            ROCKET,
            style(name).bold(),
            style(total).cyan(),
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::OperationStarted {
            index,
            total,
            summary,
            ..
        } => format!(
            "{} [{}/{}] {}",
            SPINNER,
            index + 1,
            total,
            style(summary).cyan()
        ),
        ExecutionEvent::OperationCompleted {
            index,
            kind,
            elapsed_ms,
        } => format!(
            "{} [{}] {} {}",
            CHECK,
            index + 1,
            style(kind).green(),
            style(format_elapsed(*elapsed_ms)).dim()
        ),
        ExecutionEvent::OperationHeld {
            index,
            kind,
            description,
        } => format!(
            "{} [{}] {} {}",
            EYES,
            index + 1,
            style(kind).green(),
            style(description).dim()
        ),
        ExecutionEvent::OperationFailed { index, kind, error } => format!(
            "{} [{}] {}: {}",
            CROSS,
            index + 1,
            style(kind).red(),
            style(error).dim()
        ),
        ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        } => format!(
            "{} Run ({}) {}",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

/// Prints run events, with a spinner while each operation is in flight
pub struct EventPrinter {
    spinner: Mutex<Option<ProgressBar>>,
    show_spinner: bool,
}

impl EventPrinter {
    pub fn new(show_spinner: bool) -> Self {
        Self {
            spinner: Mutex::new(None),
            show_spinner,
        }
    }

    pub fn handle(&self, event: &ExecutionEvent) {
        let Ok(mut spinner) = self.spinner.lock() else {
            return;
        };
        if let Some(active) = spinner.take() {
            active.finish_and_clear();
        }

        match event {
            ExecutionEvent::OperationStarted { summary, .. } if self.show_spinner => {
                *spinner = Some(create_spinner(summary.clone()));
            }
            _ => println!("{}", format_execution_event(event)),
        }
    }
}

/// Format a flattened operation list, one line per operation
pub fn format_plan(name: &str, operations: &[Operation]) -> String {
    let mut lines = vec![format!(
        "{} {} expands to {} operations:",
        INFO,
        style(name).bold(),
        style(operations.len()).cyan()
    )];
    for (index, operation) in operations.iter().enumerate() {
        lines.push(format!(
            "  {:>2}. {}",
            index + 1,
            operation.summary()
        ));
    }
    lines.join("\n")
}
