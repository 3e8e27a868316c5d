//! CLI output formatting for planning and running.
//!
//! # Output Format
//!
//! ## Dry run
//!
//! ```text
//! Plan: folder, 2 images → watermarked
//! DRY-RUN: photos/a.jpg -> watermarked/a_watermarked.jpg
//! DRY-RUN: photos/sub/b.png -> watermarked/sub/b_watermarked.png
//!
//! planned: 2
//! skipped: 0
//! failed: 0
//! output: watermarked
//! ```
//!
//! ## Run
//!
//! ```text
//! [1/2] photos/a.jpg -> watermarked/a_watermarked.jpg
//! [2/2] photos/sub/b.png: failed: Corrupt image file photos/sub/b.png: ...
//!
//! processed: 1
//! skipped: 0
//! failed: 1
//! output: watermarked
//!
//! Failures
//!     photos/sub/b.png: Corrupt image file ...
//!         caused by: ...
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::plan::{BatchPlan, InputKind};
use crate::run::{ItemFailure, ItemOutcome, RunEvent, RunResult};

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn kind_label(kind: InputKind) -> &'static str {
    match kind {
        InputKind::Single => "single file",
        InputKind::Folder => "folder",
        InputKind::Glob => "glob",
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "image" } else { "images" }
}

// ============================================================================
// Plan
// ============================================================================

/// Header plus one `DRY-RUN: in -> out` line per item.
pub fn format_plan(plan: &BatchPlan) -> Vec<String> {
    let mut lines = vec![format!(
        "Plan: {}, {} {} → {}",
        kind_label(plan.kind),
        plan.len(),
        plural(plan.len()),
        plan.output_root.display()
    )];
    lines.extend(plan.items.iter().map(|item| {
        format!(
            "DRY-RUN: {} -> {}",
            item.input.display(),
            item.output.display()
        )
    }));
    lines
}

pub fn print_plan(plan: &BatchPlan) {
    for line in format_plan(plan) {
        println!("{}", line);
    }
}

// ============================================================================
// Run events
// ============================================================================

/// Line for a progress event. `Started` events produce nothing; dry-run
/// items are covered by [`format_plan`].
pub fn format_run_event(event: &RunEvent) -> Option<String> {
    let RunEvent::Finished {
        index,
        total,
        input,
        outcome,
    } = event
    else {
        return None;
    };
    let counter = format!("[{}/{}]", index + 1, total);
    match outcome {
        ItemOutcome::Planned { .. } => None,
        ItemOutcome::Processed { output } => Some(format!(
            "{counter} {} -> {}",
            input.display(),
            output.display()
        )),
        ItemOutcome::Skipped { output } => Some(format!(
            "{counter} {}: skipped, {} exists",
            input.display(),
            output.display()
        )),
        ItemOutcome::Failed { message } => {
            Some(format!("{counter} {}: failed: {message}", input.display()))
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Aggregate counts, always printed. In dry-run the first count is labelled
/// `planned`.
pub fn format_summary(result: &RunResult) -> Vec<String> {
    let label = if result.dry_run { "planned" } else { "processed" };
    vec![
        format!("{label}: {}", result.processed),
        format!("skipped: {}", result.skipped),
        format!("failed: {}", result.failed),
        format!("output: {}", result.output_root.display()),
    ]
}

/// One entry per failure. With `verbose`, each cause in the chain follows
/// on its own line.
pub fn format_failures(failures: &[ItemFailure], verbose: bool) -> Vec<String> {
    if failures.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Failures".to_string()];
    for failure in failures {
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            failure.input.display(),
            failure.message
        ));
        if verbose {
            for cause in &failure.causes {
                lines.push(format!("{}caused by: {cause}", indent(2)));
            }
        }
    }
    lines
}

pub fn print_summary(result: &RunResult, verbose: bool) {
    println!();
    for line in format_summary(result) {
        println!("{}", line);
    }
    let failures = format_failures(&result.failures, verbose);
    if !failures.is_empty() {
        println!();
        for line in failures {
            println!("{}", line);
        }
    }
}

// ============================================================================
// JSON
// ============================================================================

/// `{"plan": ..., "result": ...}` as pretty JSON.
pub fn format_json(plan: &BatchPlan, result: &RunResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "plan": plan,
        "result": result,
    }))
}

pub fn print_json(plan: &BatchPlan, result: &RunResult) -> Result<(), serde_json::Error> {
    println!("{}", format_json(plan, result)?);
    Ok(())
}
