//! Run driver: execute a [`BatchPlan`] item by item.
//!
//! Each item goes through load → overlay build → composite → save. Items
//! are processed sequentially and independently: a failure is recorded and
//! the next item runs.
//!
//! ```text
//! Pending ──┬── output exists, no --overwrite ──→ Skipped
//!           ├── load/encode error ──────────────→ Failed
//!           └── written ────────────────────────→ Processed
//! ```
//!
//! In dry-run mode nothing is loaded or written and every item is reported
//! as planned.
//!
//! Progress is reported through an optional [`Sender<RunEvent>`] so the CLI
//! can print lines as items finish.

use crate::imaging::{
    ImageBackend, ImagingError, PreparedWatermark, Quality, RustBackend, Sizing, composite,
    overlay,
};
use crate::plan::{BatchPlan, JobItem};
use crate::types::PlacementSpec;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub overwrite: bool,
    pub dry_run: bool,
    pub sizing: Sizing,
    pub jpeg_quality: Quality,
}

/// What happened to one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemOutcome {
    /// Dry-run only: the item would have been processed.
    Planned { output: PathBuf },
    Processed { output: PathBuf },
    Skipped { output: PathBuf },
    Failed { message: String },
}

/// Progress events, in order: one `Started` then one `Finished` per item.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started {
        index: usize,
        total: usize,
        item: JobItem,
    },
    Finished {
        index: usize,
        total: usize,
        input: PathBuf,
        outcome: ItemOutcome,
    },
}

/// A failed item and its error chain, outermost first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub input: PathBuf,
    pub output: PathBuf,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

/// Aggregate result of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    /// Items written, or in dry-run mode, items planned.
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<ItemFailure>,
    pub dry_run: bool,
    pub output_root: PathBuf,
}

impl RunResult {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    fn record(&mut self, item: &JobItem, outcome: &ItemOutcome, causes: Vec<String>) {
        match outcome {
            ItemOutcome::Planned { .. } | ItemOutcome::Processed { .. } => self.processed += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Failed { message } => {
                self.failed += 1;
                self.failures.push(ItemFailure {
                    input: item.input.clone(),
                    output: item.output.clone(),
                    message: message.clone(),
                    causes,
                });
            }
        }
    }
}

/// Run `plan` with the pure Rust backend.
pub fn run(
    plan: &BatchPlan,
    watermark: &PreparedWatermark,
    placement: &PlacementSpec,
    options: &RunOptions,
    events: Option<&Sender<RunEvent>>,
) -> RunResult {
    let backend = RustBackend::new(options.jpeg_quality);
    run_with_backend(&backend, plan, watermark, placement, options, events)
}

/// Run `plan` using a specific backend (allows testing with mock).
pub fn run_with_backend(
    backend: &impl ImageBackend,
    plan: &BatchPlan,
    watermark: &PreparedWatermark,
    placement: &PlacementSpec,
    options: &RunOptions,
    events: Option<&Sender<RunEvent>>,
) -> RunResult {
    if options.dry_run {
        return dry_run(plan, events);
    }

    drive(plan, false, events, |item| {
        if !options.overwrite && item.output.exists() {
            debug!(output = %item.output.display(), "Output exists, skipping");
            return (
                ItemOutcome::Skipped {
                    output: item.output.clone(),
                },
                Vec::new(),
            );
        }
        match process_item(backend, item, watermark, placement, &options.sizing) {
            Ok(()) => {
                debug!(input = %item.input.display(), output = %item.output.display(), "Watermarked");
                (
                    ItemOutcome::Processed {
                        output: item.output.clone(),
                    },
                    Vec::new(),
                )
            }
            Err(e) => {
                warn!(input = %item.input.display(), error = %e, "Failed to watermark");
                (
                    ItemOutcome::Failed {
                        message: e.to_string(),
                    },
                    error_chain(&e),
                )
            }
        }
    })
}

/// Report every item of `plan` as planned without loading, decoding or
/// writing anything.
pub fn dry_run(plan: &BatchPlan, events: Option<&Sender<RunEvent>>) -> RunResult {
    drive(plan, true, events, |item| {
        (
            ItemOutcome::Planned {
                output: item.output.clone(),
            },
            Vec::new(),
        )
    })
}

/// Walk the plan in order, emitting events around `outcome_for` and
/// folding each outcome into the result.
fn drive(
    plan: &BatchPlan,
    dry_run: bool,
    events: Option<&Sender<RunEvent>>,
    mut outcome_for: impl FnMut(&JobItem) -> (ItemOutcome, Vec<String>),
) -> RunResult {
    let mut result = RunResult {
        dry_run,
        output_root: plan.output_root.clone(),
        ..RunResult::default()
    };
    let total = plan.len();
    let emit = |event: RunEvent| {
        if let Some(tx) = events {
            // A dropped receiver only means nobody is listening
            let _ = tx.send(event);
        }
    };

    for (index, item) in plan.items.iter().enumerate() {
        emit(RunEvent::Started {
            index,
            total,
            item: item.clone(),
        });
        let (outcome, causes) = outcome_for(item);
        result.record(item, &outcome, causes);
        emit(RunEvent::Finished {
            index,
            total,
            input: item.input.clone(),
            outcome,
        });
    }

    result
}

fn process_item(
    backend: &impl ImageBackend,
    item: &JobItem,
    watermark: &PreparedWatermark,
    placement: &PlacementSpec,
    sizing: &Sizing,
) -> Result<(), ImagingError> {
    let base = backend.load(&item.input)?;
    let had_alpha = base.color().has_alpha();
    let base = base.to_rgba8();

    let overlay = overlay::build(watermark, base.dimensions(), placement, sizing);
    let stamped = composite(&base, &overlay.layer, overlay.anchor);
    backend.save(&stamped, had_alpha, &item.output)
}

/// Messages of every `source()` below `err`.
fn error_chain(err: &dyn Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    causes
}
