//! Watermark configuration module.
//!
//! Handles loading, validating, and merging `watermark.toml`. Stock defaults
//! are overridden by the user's config file, and command-line flags override
//! both.
//!
//! ## Config File Location
//!
//! `--config <path>` if given, otherwise `watermark.toml` in the current
//! directory when present. Without either, stock defaults apply.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [placement]
//! position = "br"           # tl, tr, bl, br, c
//! opacity = 35              # 0 (invisible) to 100 (as authored)
//! margin = 24               # pixels from the anchored edges
//!
//! [logo]
//! width_fraction = 0.2      # logo width relative to image width
//! min_width = 48            # pixels
//! max_width_fraction = 0.8
//!
//! [text]
//! size_fraction = 0.05      # font size relative to image width
//! min_size = 16
//! max_size = 256
//! # font = "/path/to/font.ttf"
//! fallback_fonts = ["DejaVuSans.ttf", "Arial.ttf", "arial.ttf", "LiberationSans-Regular.ttf"]
//!
//! [output]
//! suffix = "_watermarked"   # appended to output file stems
//! folder_name = "watermarked"
//! jpeg_quality = 95
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [placement]
//! position = "tl"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{DEFAULT_FALLBACK_FONTS, LogoSizing, Quality, Sizing, TextSizing};
use crate::naming::{DEFAULT_SUFFIX, OutputNaming};
use crate::plan::DEFAULT_FOLDER_NAME;
use crate::types::{DEFAULT_MARGIN, DEFAULT_OPACITY, Opacity, PlacementSpec, Position};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "watermark.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `watermark.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub placement: PlacementConfig,
    pub logo: LogoConfig,
    pub text: TextConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacementConfig {
    pub position: Position,
    pub opacity: u32,
    pub margin: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            position: Position::default(),
            opacity: DEFAULT_OPACITY,
            margin: DEFAULT_MARGIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogoConfig {
    pub width_fraction: f32,
    pub min_width: u32,
    pub max_width_fraction: f32,
}

impl Default for LogoConfig {
    fn default() -> Self {
        let d = LogoSizing::default();
        Self {
            width_fraction: d.width_fraction,
            min_width: d.min_width,
            max_width_fraction: d.max_width_fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    pub size_fraction: f32,
    pub min_size: u32,
    pub max_size: u32,
    /// Font file tried before the fallback names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
    /// Font file names searched in the system font directories, in order.
    pub fallback_fonts: Vec<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        let d = TextSizing::default();
        Self {
            size_fraction: d.size_fraction,
            min_size: d.min_size,
            max_size: d.max_size,
            font: None,
            fallback_fonts: DEFAULT_FALLBACK_FONTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub suffix: String,
    pub folder_name: String,
    pub jpeg_quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            jpeg_quality: Quality::default().value() as u32,
        }
    }
}

fn fraction_in_range(value: f32) -> bool {
    value > 0.0 && value <= 1.0
}

fn is_plain_name(value: &str) -> bool {
    !value.is_empty() && !value.contains(['/', '\\'])
}

impl WatermarkConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.placement.opacity > 100 {
            return Err(ConfigError::Validation(
                "placement.opacity must be 0-100".into(),
            ));
        }
        if !fraction_in_range(self.logo.width_fraction)
            || !fraction_in_range(self.logo.max_width_fraction)
        {
            return Err(ConfigError::Validation(
                "logo.width_fraction and logo.max_width_fraction must be in (0, 1]".into(),
            ));
        }
        if self.logo.min_width == 0 {
            return Err(ConfigError::Validation(
                "logo.min_width must be non-zero".into(),
            ));
        }
        if !fraction_in_range(self.text.size_fraction) {
            return Err(ConfigError::Validation(
                "text.size_fraction must be in (0, 1]".into(),
            ));
        }
        if self.text.min_size == 0 || self.text.min_size > self.text.max_size {
            return Err(ConfigError::Validation(
                "text.min_size must be non-zero and not above text.max_size".into(),
            ));
        }
        if !is_plain_name(&self.output.suffix) || !is_plain_name(&self.output.folder_name) {
            return Err(ConfigError::Validation(
                "output.suffix and output.folder_name must be non-empty and contain no path separators"
                    .into(),
            ));
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::Validation(
                "output.jpeg_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }

    /// Placement from the `[placement]` section.
    pub fn placement(&self) -> Result<PlacementSpec, ConfigError> {
        let opacity = Opacity::new(self.placement.opacity)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(PlacementSpec {
            position: self.placement.position,
            opacity,
            margin: self.placement.margin,
        })
    }

    pub fn sizing(&self) -> Sizing {
        Sizing {
            logo: LogoSizing {
                width_fraction: self.logo.width_fraction,
                min_width: self.logo.min_width,
                max_width_fraction: self.logo.max_width_fraction,
            },
            text: TextSizing {
                size_fraction: self.text.size_fraction,
                min_size: self.text.min_size,
                max_size: self.text.max_size,
            },
        }
    }

    pub fn naming(&self) -> OutputNaming {
        OutputNaming {
            suffix: self.output.suffix.clone(),
        }
    }

    pub fn jpeg_quality(&self) -> Quality {
        Quality::new(self.output.jpeg_quality)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(WatermarkConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<WatermarkConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: WatermarkConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config.
///
/// An explicit path must exist. Without one, `watermark.toml` in
/// `working_dir` is used when present.
pub fn load_config(
    explicit: Option<&Path>,
    working_dir: &Path,
) -> Result<WatermarkConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            let path = working_dir.join(path);
            match load_raw_config(&path)? {
                Some(value) => Some(value),
                None => return Err(ConfigError::NotFound(path)),
            }
        }
        None => load_raw_config(&working_dir.join(CONFIG_FILE_NAME))?,
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `watermark.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Watermarker Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# This file is read from --config <path>, or from ./watermark.toml when
# present. Command-line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Placement
# ---------------------------------------------------------------------------
[placement]
# Corner or center: tl, tr, bl, br, c (or top-left, ..., center).
position = "br"

# 0 = invisible, 100 = watermark alpha as authored.
opacity = 35

# Distance in pixels from the anchored edges. Ignored for "c".
margin = 24

# ---------------------------------------------------------------------------
# Logo watermarks (--watermark)
# ---------------------------------------------------------------------------
[logo]
# Logo width as a fraction of the image width. Height keeps the aspect ratio.
width_fraction = 0.2

# Never narrower than this many pixels...
min_width = 48

# ...and never wider than this fraction of the image (unless min_width says otherwise).
max_width_fraction = 0.8

# ---------------------------------------------------------------------------
# Text watermarks (--text)
# ---------------------------------------------------------------------------
[text]
# Font size as a fraction of the image width, clamped to [min_size, max_size].
size_fraction = 0.05
min_size = 16
max_size = 256

# Font file to use. Falls back to fallback_fonts, then a built-in bitmap font.
# font = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"

# File names searched for in the system font directories, in order.
fallback_fonts = ["DejaVuSans.ttf", "Arial.ttf", "arial.ttf", "LiberationSans-Regular.ttf"]

# ---------------------------------------------------------------------------
# Output naming and encoding
# ---------------------------------------------------------------------------
[output]
# Appended to every output file stem: photo.jpg -> photo_watermarked.jpg
suffix = "_watermarked"

# Default output folder for folder and glob inputs.
folder_name = "watermarked"

# JPEG encoding quality (1 = worst, 100 = best).
jpeg_quality = 95
"##
}
