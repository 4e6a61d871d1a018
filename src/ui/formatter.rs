//! Pure formatting functions for UI output.
//!
//! All console output of a run goes through here: task progress, captured
//! command output, warnings and errors. Styling uses the `console` crate,
//! which drops colours when the stream is not a terminal.

use crate::warning::PipelineWarning;
use console::style;
use std::time::Duration;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a pipeline warning to the user.
pub fn display_warning(warning: &PipelineWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Human-readable elapsed time, e.g. `340 ms`, `1.2 s`, `2.5 min`.
pub fn format_duration(elapsed: Duration) -> String {
    let micros = elapsed.as_micros();
    if micros < 1_000 {
        format!("{} μs", micros)
    } else if micros < 1_000_000 {
        format!("{} ms", elapsed.as_millis())
    } else if elapsed.as_secs() < 60 {
        format!("{:.1} s", elapsed.as_secs_f64())
    } else {
        format!("{:.1} min", elapsed.as_secs_f64() / 60.0)
    }
}

pub fn display_task_start(task: &str) {
    println!("Starting '{}'...", style(task).cyan());
}

pub fn display_task_finish(task: &str, elapsed: Duration) {
    println!(
        "Finished '{}' after {}",
        style(task).cyan(),
        style(format_duration(elapsed)).magenta()
    );
}

pub fn display_task_failed(task: &str, elapsed: Duration) {
    eprintln!(
        "'{}' {} after {}",
        style(task).cyan(),
        style("errored").red(),
        style(format_duration(elapsed)).magenta()
    );
}

/// Echo the captured streams of an external command.
///
/// Empty streams print nothing.
pub fn display_command_output(task: &str, stdout: &str, stderr: &str) {
    let stdout = stdout.trim_end();
    let stderr = stderr.trim_end();

    if !stdout.is_empty() {
        println!("{}", stdout);
    }
    if !stderr.is_empty() {
        eprintln!("{}", stderr);
    }
    if !stdout.is_empty() || !stderr.is_empty() {
        tracing::trace!(task, "echoed command output");
    }
}

/// Display registered tasks with their descriptions.
pub fn display_task_list(tasks: &[(String, String)]) {
    println!("{}", style("Tasks:").bold());
    let width = tasks.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, description) in tasks {
        println!(
            "  {:<width$}  {}",
            style(name).cyan(),
            style(description).dim(),
            width = width
        );
    }
}

/// Display an execution plan, one node per line.
pub fn display_plan(task: &str, lines: &[String]) {
    println!("{} '{}':", style("Execution plan for").bold(), task);
    for line in lines {
        println!("  {}", line);
    }
}
