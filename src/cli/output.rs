//! CLI output formatting

use crate::{
    core::{ExecutionStatus, StepStatus, TaskGraph, TaskState},
    execution::{ExecutionEvent, PipelineResult},
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static LOCK: Emoji<'_, '_> = Emoji("🔒 ", "# ");

/// Create a progress bar over the steps of a plan
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a task state for display
pub fn format_task_state(state: TaskState) -> String {
    match state {
        TaskState::Pending => style("PENDING").dim().to_string(),
        TaskState::Running => style("RUNNING").yellow().to_string(),
        TaskState::Succeeded => style("SUCCEEDED").green().to_string(),
        TaskState::Failed => style("FAILED").red().to_string(),
        TaskState::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
        ExecutionStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            target,
            plan,
            total_steps,
        } => format!(
            "{} Running {} ({}): {} ({} steps)",
            ROCKET,
            style(target).bold(),
            style(&execution_id.to_string()[..8]).dim(),
            plan.join(" → "),
            total_steps
        ),
        ExecutionEvent::TaskStarted { task } => {
            format!("{} Task {}", INFO, style(task).bold())
        }
        ExecutionEvent::TaskSkipped { task, reason } => format!(
            "{} Skipping {}: {}",
            WARN,
            style(task).yellow(),
            style(reason).dim()
        ),
        ExecutionEvent::StepStarted {
            task,
            step,
            command,
            elevated,
        } => {
            if *elevated {
                format!(
                    "{} {}/{} {} {}",
                    LOCK,
                    style(task).cyan(),
                    style(step).cyan(),
                    style("[elevated]").red().bold(),
                    command
                )
            } else {
                format!(
                    "{} {}/{} {}",
                    SPINNER,
                    style(task).cyan(),
                    style(step).cyan(),
                    style(command).dim()
                )
            }
        }
        ExecutionEvent::StepOutput { task, step, output } => format!(
            "{} Output from {}/{}:\n{}",
            INFO,
            style(task).dim(),
            style(step).dim(),
            output
        ),
        ExecutionEvent::StepCompleted {
            step,
            status,
            elapsed_ms,
            ..
        } => match status {
            StepStatus::Skipped { existing } => format!(
                "{} {} skipped ({} already exists)",
                INFO,
                style(step).dim(),
                existing
            ),
            StepStatus::Tolerated { reason } => format!(
                "{} {} failed ({}), ignored: best-effort",
                WARN,
                style(step).yellow(),
                reason
            ),
            _ => format!(
                "{} {} ({})",
                CHECK,
                style(step).green(),
                style(format_duration(Duration::from_millis(*elapsed_ms))).dim()
            ),
        },
        ExecutionEvent::StepFailed { task, step, reason } => format!(
            "{} {}/{}: {}",
            CROSS,
            style(task).red(),
            style(step).red(),
            style(reason).dim()
        ),
        ExecutionEvent::TaskFinished { task, state } => match state {
            TaskState::Succeeded => format!("{} {}", CHECK, style(task).green()),
            TaskState::Failed => format!("{} {}", CROSS, style(task).red()),
            other => format!("{} {} {}", INFO, task, format_task_state(*other)),
        },
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

/// Format the end-of-run report
///
/// On failure this names the failing task and step, shows the tail of its
/// captured output, and lists the tasks that had already completed.
pub fn format_report(result: &PipelineResult) -> String {
    let mut lines = vec![separator()];

    for task in &result.tasks {
        let mut line = format!("  {:<16} {}", task.name, format_task_state(task.state));
        if let Some(reason) = &task.skip_reason {
            line.push_str(&format!(" {}", style(format!("({})", reason)).dim()));
        }
        lines.push(line);
    }

    match &result.failure {
        None => lines.push(format!(
            "\n{} {} completed {}",
            CHECK,
            style(&result.target).bold(),
            style("successfully").green()
        )),
        Some(failure) => {
            let headline = if failure.reason.is_interrupt() {
                style("interrupted").yellow().to_string()
            } else {
                style("failed").red().to_string()
            };
            lines.push(format!(
                "\n{} {} {} in task {} at step {}: {}",
                CROSS,
                style(&result.target).bold(),
                headline,
                style(&failure.task).bold(),
                style(&failure.step).bold(),
                failure.reason
            ));

            for (label, captured) in [("stdout", &failure.stdout), ("stderr", &failure.stderr)] {
                if !captured.trim().is_empty() {
                    lines.push(format!("  {}:", style(label).dim()));
                    lines.push(format_output(captured.trim_end(), 20));
                }
            }

            let completed = result.completed_tasks();
            if completed.is_empty() {
                lines.push(format!("  {} No task completed", INFO));
            } else {
                lines.push(format!("  {} Completed before failure: {}", INFO, completed.join(", ")));
            }
        }
    }

    lines.join("\n")
}

/// Describe the tasks of a graph, one line per task plus its dependencies
pub fn format_task_list(graph: &TaskGraph) -> String {
    let mut lines = Vec::new();
    for task in graph.tasks() {
        let mut header = format!("  {}", style(&task.name).bold());
        if !task.aliases.is_empty() {
            header.push_str(&format!(" ({})", task.aliases.join(", ")));
        }
        if let Some(description) = &task.description {
            header.push_str(&format!(" - {}", description));
        }
        lines.push(header);

        if !task.depends_on.is_empty() {
            lines.push(format!(
                "      depends on: {}",
                style(task.depends_on.join(", ")).cyan()
            ));
        }
        let elevated = task.steps.iter().filter(|s| s.is_elevated()).count();
        let mut steps = format!("      steps: {}", task.steps.len());
        if elevated > 0 {
            steps.push_str(&format!(" ({} elevated)", style(elevated).red()));
        }
        lines.push(steps);
    }
    lines.join("\n")
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let tail = lines[lines.len() - max_lines..].join("\n");
        format!(
            "{}... ({} earlier lines)\n{}",
            style("[truncated]").dim(),
            lines.len() - max_lines,
            tail
        )
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Horizontal rule spanning the terminal width
pub fn separator() -> String {
    let width = term_size::dimensions_stdout()
        .map(|(w, _)| w)
        .unwrap_or(80);
    "─".repeat(width.min(120))
}
