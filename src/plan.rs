//! Batch planning: turn an input spec into an ordered list of jobs.
//!
//! The input string is classified in priority order:
//!
//! 1. an existing **file** → a single job
//! 2. an existing **directory** → every supported image in it (top level,
//!    or the whole tree with `recursive`)
//! 3. a **glob pattern** (contains `*`, `?` or `[`) → every supported match
//!
//! Anything else is [`PlanError::InvalidInput`].
//!
//! ## Output layout
//!
//! ```text
//! photos/                  watermarked/              (default root: beside the folder)
//! ├── a.jpg           →    ├── a_watermarked.jpg
//! └── sub/                 └── sub/
//!     └── b.PNG       →        └── b_watermarked.png
//! ```
//!
//! Globs mirror each match's path relative to the working directory under
//! `./watermarked/` (or just the file name for matches outside it). A single
//! file is written next to its input unless `--output` says otherwise.
//!
//! Outputs never collide within a plan. Without overwrite they also avoid
//! files already on disk (see [`OutputNaming::unique_path`]).
//!
//! Planning touches the filesystem read-only and is deterministic: the same
//! filesystem state yields the same plan.

use crate::imaging::is_supported;
use crate::naming::OutputNaming;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const DEFAULT_FOLDER_NAME: &str = "watermarked";

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unsupported input format: {} (supported: {})", .0.display(), crate::imaging::SUPPORTED_EXTENSIONS.join(", "))]
    UnsupportedFormat(PathBuf),
    #[error("Unsupported output format: {}", .0.display())]
    UnsupportedOutput(PathBuf),
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Single,
    Folder,
    Glob,
}

/// One input image and where its watermarked copy goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobItem {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Ordered jobs for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    pub kind: InputKind,
    /// Directory outputs are written under. For a single file, the output's parent.
    pub output_root: PathBuf,
    pub items: Vec<JobItem>,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Everything the planner needs.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// File, directory or glob pattern, as typed.
    pub input: String,
    pub output: Option<PathBuf>,
    pub recursive: bool,
    pub overwrite: bool,
    /// Base for relative inputs, outputs and globs. Usually the process cwd.
    pub working_dir: PathBuf,
    pub naming: OutputNaming,
    /// Name of the default batch output directory.
    pub folder_name: String,
}

impl PlanRequest {
    pub fn new(input: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            recursive: false,
            overwrite: false,
            working_dir: working_dir.into(),
            naming: OutputNaming::default(),
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
        }
    }
}

/// Whether `input` contains glob metacharacters.
pub fn is_glob_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// Resolve `request` into a [`BatchPlan`].
pub fn plan(request: &PlanRequest) -> Result<BatchPlan, PlanError> {
    let candidate = request.working_dir.join(&request.input);

    let plan = if candidate.is_file() {
        plan_single(request, &candidate)?
    } else if candidate.is_dir() {
        plan_folder(request, &candidate)?
    } else if is_glob_pattern(&request.input) {
        plan_glob(request)?
    } else {
        return Err(PlanError::InvalidInput(format!(
            "'{}' is not a file, folder, or glob pattern (e.g. './images/*.png')",
            request.input
        )));
    };

    debug!(kind = ?plan.kind, items = plan.len(), root = %plan.output_root.display(), "Planned batch");
    Ok(plan)
}

fn plan_single(request: &PlanRequest, input: &Path) -> Result<BatchPlan, PlanError> {
    let input = input.canonicalize()?;
    if !is_supported(&input) {
        return Err(PlanError::UnsupportedFormat(input));
    }

    let naming = &request.naming;
    let beside = input.parent().unwrap_or(Path::new("/"));
    let target = match &request.output {
        None => naming.in_dir(beside, &input),
        Some(output) => {
            let output = request.working_dir.join(output);
            if output.is_dir() || output.extension().is_none() {
                naming.in_dir(&output, &input)
            } else if is_supported(&output) {
                output
            } else {
                return Err(PlanError::UnsupportedOutput(output));
            }
        }
    };

    let output = if request.overwrite {
        target
    } else {
        naming.unique_path(&target, &HashSet::new())
    };
    let output_root = output.parent().map(Path::to_path_buf).unwrap_or_default();

    Ok(BatchPlan {
        kind: InputKind::Single,
        output_root,
        items: vec![JobItem { input, output }],
    })
}

fn plan_folder(request: &PlanRequest, dir: &Path) -> Result<BatchPlan, PlanError> {
    let dir = dir.canonicalize()?;
    let output_root = match &request.output {
        Some(output) => request.working_dir.join(output),
        None => dir
            .parent()
            .unwrap_or(&dir)
            .join(&request.folder_name),
    };
    // An output root equal to the input folder excludes nothing
    let exclude = Some(comparable(&output_root)).filter(|root| *root != dir);

    let max_depth = if request.recursive { usize::MAX } else { 1 };
    let mut inputs = BTreeSet::new();
    for entry in WalkDir::new(&dir).min_depth(1).max_depth(max_depth) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        let excluded = exclude.as_ref().is_some_and(|root| path.starts_with(root));
        // `Path::is_file` follows symlinks, `DirEntry::file_type` does not
        if path.is_file() && is_supported(path) && !excluded {
            inputs.insert(path.to_path_buf());
        }
    }

    let items = assign_outputs(request, &output_root, inputs, |input| {
        input.strip_prefix(&dir).ok().map(Path::to_path_buf)
    })?;
    Ok(BatchPlan {
        kind: InputKind::Folder,
        output_root,
        items,
    })
}

fn plan_glob(request: &PlanRequest) -> Result<BatchPlan, PlanError> {
    let pattern = if Path::new(&request.input).is_absolute() {
        request.input.clone()
    } else {
        let base = glob::Pattern::escape(&request.working_dir.to_string_lossy());
        format!("{base}/{}", request.input.trim_start_matches("./"))
    };

    let output_root = match &request.output {
        Some(output) => request.working_dir.join(output),
        None => request.working_dir.join(&request.folder_name),
    };
    let exclude = comparable(&output_root);

    let mut inputs = BTreeSet::new();
    for entry in glob::glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable glob match");
                continue;
            }
        };
        if !path.is_file() || !is_supported(&path) {
            continue;
        }
        let path = path.canonicalize()?;
        if !path.starts_with(&exclude) {
            inputs.insert(path);
        }
    }

    let working_dir = comparable(&request.working_dir);
    let items = assign_outputs(request, &output_root, inputs, |input| {
        input.strip_prefix(&working_dir).ok().map(Path::to_path_buf)
    })?;
    Ok(BatchPlan {
        kind: InputKind::Glob,
        output_root,
        items,
    })
}

/// Map sorted inputs to unique outputs under `root`, mirroring `relative(input)`
/// (or just the file name when it is `None`).
fn assign_outputs(
    request: &PlanRequest,
    root: &Path,
    inputs: BTreeSet<PathBuf>,
    relative: impl Fn(&Path) -> Option<PathBuf>,
) -> Result<Vec<JobItem>, PlanError> {
    if inputs.is_empty() {
        return Err(PlanError::InvalidInput(
            "no supported input images".to_string(),
        ));
    }

    let mut claimed = HashSet::new();
    let mut items = Vec::with_capacity(inputs.len());
    for input in inputs {
        let subdir = relative(&input)
            .and_then(|rel| rel.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let candidate = request.naming.in_dir(&root.join(subdir), &input);
        let output = if request.overwrite {
            request.naming.unique_in_plan(&candidate, &claimed)
        } else {
            request.naming.unique_path(&candidate, &claimed)
        };
        claimed.insert(output.clone());
        items.push(JobItem { input, output });
    }
    Ok(items)
}

/// Canonical form of `path` when it exists, so prefix checks see through symlinks.
fn comparable(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
