//! # Watermarker
//!
//! Stamp a logo or a line of text onto one image, a folder of images, or
//! every image matched by a glob.
//!
//! # Architecture: Plan, Then Run
//!
//! ```text
//! 1. Plan   input spec  →  BatchPlan   (filesystem → ordered input/output pairs)
//! 2. Run    BatchPlan   →  RunResult   (load → overlay → composite → save, per item)
//! ```
//!
//! Planning reads the filesystem but never writes it, so `--dry-run` is just
//! "plan, then report without running". Running is sequential and an item
//! failure never stops the batch.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`plan`] | Classifies the input (file, folder, glob), collects images, assigns unique outputs |
//! | [`run`] | Executes a plan item by item, emits progress events, aggregates counts |
//! | [`imaging`] | Decoding, overlay building, compositing and encoding |
//! | [`naming`] | `<stem>_watermarked.<ext>` naming and collision avoidance |
//! | [`types`] | Watermark and placement types shared by all of the above |
//! | [`config`] | `watermark.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting: plan lines, progress lines, summary, JSON |
//! | [`wizard`] | Interactive prompts for options missing from the command line |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate, text is rasterized with
//! `ab_glyph`, and GIF output is quantized with the `gif` crate. No system
//! libraries are needed. When no TrueType font is found, a built-in bitmap
//! font still produces a legible stamp.
//!
//! ## Overlay Sized From the Canvas
//!
//! A logo is resized to a fraction of each image's width and text is set at
//! a font size proportional to it, so the same watermark looks the same on a
//! phone snapshot and a 40 megapixel frame.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod plan;
pub mod run;
pub mod types;
pub mod wizard;

#[cfg(test)]
pub(crate) mod test_helpers;
