//! Output file naming.
//!
//! Every output is named `<stem><suffix>.<ext>` (suffix `_watermarked` by
//! default, extension lowercased):
//! - `IMG_0001.JPG` → `IMG_0001_watermarked.jpg`
//! - `logo.png` → `logo_watermarked.png`
//!
//! When that name is taken and overwriting is off, [`unique_path`] appends
//! the suffix again, then a counter starting at 2:
//! - `a_watermarked.jpg` → `a_watermarked_watermarked.jpg`
//! - → `a_watermarked_watermarked2.jpg`, `a_watermarked_watermarked3.jpg`, ...
//!
//! With overwriting on, existing files are replaced but two inputs of one
//! plan (`a.jpg` and `a.JPG`) still get distinct outputs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_SUFFIX: &str = "_watermarked";

/// Naming rule for outputs. Built from `[output] suffix` in the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    pub suffix: String,
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

impl OutputNaming {
    /// Output file name for `input`: `<stem><suffix>.<ext lowercased>`.
    pub fn file_name(&self, input: &Path) -> String {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match input.extension() {
            Some(ext) => format!(
                "{stem}{}.{}",
                self.suffix,
                ext.to_string_lossy().to_ascii_lowercase()
            ),
            None => format!("{stem}{}", self.suffix),
        }
    }

    /// Output path for `input` inside `dir`.
    pub fn in_dir(&self, dir: &Path, input: &Path) -> PathBuf {
        dir.join(self.file_name(input))
    }

    /// First path derived from `candidate` that is neither on disk nor in `claimed`.
    pub fn unique_path(&self, candidate: &Path, claimed: &HashSet<PathBuf>) -> PathBuf {
        self.first_free(candidate, |p| p.exists() || claimed.contains(p))
    }

    /// Like [`unique_path`](Self::unique_path) but only `claimed` counts as
    /// taken. Used with overwrite on, where files on disk may be replaced but
    /// two inputs must still not share an output.
    pub fn unique_in_plan(&self, candidate: &Path, claimed: &HashSet<PathBuf>) -> PathBuf {
        self.first_free(candidate, |p| claimed.contains(p))
    }

    fn first_free(&self, candidate: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
        if !taken(candidate) {
            return candidate.to_path_buf();
        }

        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = candidate
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let first = candidate.with_file_name(format!("{stem}{}{ext}", self.suffix));
        if !taken(&first) {
            return first;
        }
        let mut counter = 2u32;
        loop {
            let next = candidate.with_file_name(format!("{stem}{}{counter}{ext}", self.suffix));
            if !taken(&next) {
                return next;
            }
            counter += 1;
        }
    }
}
