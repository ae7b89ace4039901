//! Terminal output: plan display, per-operation progress, run summary

use colored::{ColoredString, Colorize};
use declarative::{
    Action, ExecutionRecord, ExecutionReport, PlannedOperation, ProgressCallback, Resource,
    pending_changes,
};
use indicatif::{ProgressBar, ProgressStyle};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

fn step(index: usize, total: usize) -> String {
    format!("[{}/{}]", index + 1, total)
}

fn record_symbol(record: &ExecutionRecord) -> ColoredString {
    match record.action {
        Action::Changed if record.operation.is_forced() => "↻".cyan(),
        Action::Changed => "✓".green(),
        Action::Skipped => "○".dimmed(),
        Action::Failed => "✗".red(),
    }
}

fn plan_symbol(planned: &PlannedOperation) -> ColoredString {
    if planned.operation.is_forced() {
        "↻".cyan()
    } else if !planned.required {
        "○".dimmed()
    } else if planned.probe.exists {
        "~".yellow()
    } else {
        "+".green()
    }
}

fn plan_line(index: usize, total: usize, planned: &PlannedOperation) -> String {
    let details = planned
        .probe
        .details
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default();

    format!(
        "{} {} {:<9} {:<45}{}",
        step(index, total).dimmed(),
        plan_symbol(planned),
        planned.operation.resource_type().dimmed(),
        planned.operation.description(),
        details.dimmed()
    )
}

/// Show what a run would do, one line per operation
pub fn display_plan(plan: &[PlannedOperation], verbose: bool) {
    let pending = pending_changes(plan);

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Provisioning Plan".bold()
    );
    println!("│");

    for (index, planned) in plan.iter().enumerate() {
        println!("│ {}", plan_line(index, plan.len(), planned));

        if verbose
            && planned.required
            && let Some(diff) = &planned.probe.diff
        {
            for line in diff.lines() {
                println!("│       {}", colorize_diff_line(line));
            }
        }
    }

    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ {} of {} operations need changes (each requests sudo on its own)",
        pending.to_string().bold(),
        plan.len()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn colorize_diff_line(line: &str) -> ColoredString {
    if line.starts_with("+++") || line.starts_with("---") {
        line.bold()
    } else if line.starts_with('+') {
        line.green()
    } else if line.starts_with('-') {
        line.red()
    } else if line.starts_with("@@") {
        line.cyan()
    } else {
        line.normal()
    }
}

/// Spinner per operation, then a status line once it completes
pub struct ConsoleProgress {
    spinner: Option<ProgressBar>,
    quiet: bool,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            spinner: None,
            quiet,
        }
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_plan(&mut self, plan: &[PlannedOperation]) {
        if !self.quiet {
            println!();
            println!(
                "  {} Applying {} operations...",
                "→".cyan(),
                plan.len()
            );
        }
    }

    fn on_operation_start(&mut self, index: usize, total: usize, planned: &PlannedOperation) {
        if self.quiet || !planned.required {
            return;
        }

        // No steady tick: sudo may prompt for a password while this is shown
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!(
            "{} {}",
            step(index, total),
            planned.operation.description()
        ));
        pb.tick();
        self.spinner = Some(pb);
    }

    fn on_operation_complete(&mut self, index: usize, total: usize, record: &ExecutionRecord) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
        if self.quiet && !record.is_failure() {
            return;
        }

        let description = record.operation.description();
        let line = format!(
            "  {} {} {}",
            record_symbol(record),
            step(index, total).dimmed(),
            if record.is_change() {
                description.normal()
            } else {
                description.dimmed()
            }
        );

        match &record.error {
            Some(error) => eprintln!("{line}\n      {}", error.red()),
            None => println!("{line}"),
        }
    }
}

/// Print final summary
pub fn print_summary(report: &ExecutionReport) {
    let summary = report.summary();

    println!();
    if summary.is_success() {
        println!("  {} Host converged", "✓".green().bold());
    } else {
        println!("  {} Provisioning stopped", "✗".red().bold());
    }

    if summary.changed > 0 {
        println!("    • {} changed", summary.changed);
    }
    if summary.skipped > 0 {
        println!("    • {} already in place", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
    if summary.not_run > 0 {
        println!("    • {} not run", summary.not_run);
    }
}
