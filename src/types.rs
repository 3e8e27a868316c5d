//! Watermark and placement types shared by the planner, the overlay builder
//! and the run driver.
//!
//! Both [`WatermarkSpec`] and [`PlacementSpec`] are built once per run (from
//! CLI flags, `watermark.toml` or wizard answers) and are read-only after that.

use crate::imaging::ImagingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_OPACITY: u32 = 35;
pub const DEFAULT_MARGIN: u32 = 24;

/// Invalid or conflicting watermark input. Surfaced to the user as exit code 2.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Opacity must be between 0 and 100, got {0}")]
    OpacityOutOfRange(u32),
    #[error("Unknown position '{0}'. Use tl, tr, bl, br, or c")]
    UnknownPosition(String),
    #[error("Text watermark cannot be empty")]
    EmptyText,
    #[error("Use exactly one of --watermark or --text")]
    ConflictingWatermark,
    #[error("Provide one of --watermark or --text")]
    MissingWatermark,
    #[error("--input is required")]
    MissingInput,
    #[error("Watermark image does not exist: {0}")]
    WatermarkNotFound(PathBuf),
    #[error("Cannot use watermark image {path}: {source}")]
    WatermarkImage {
        path: PathBuf,
        #[source]
        source: ImagingError,
    },
}

/// Where the overlay is anchored on the canvas.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Position {
    #[serde(rename = "tl", alias = "top-left")]
    #[value(name = "tl", alias = "top-left")]
    TopLeft,
    #[serde(rename = "tr", alias = "top-right")]
    #[value(name = "tr", alias = "top-right")]
    TopRight,
    #[serde(rename = "bl", alias = "bottom-left")]
    #[value(name = "bl", alias = "bottom-left")]
    BottomLeft,
    #[default]
    #[serde(rename = "br", alias = "bottom-right")]
    #[value(name = "br", alias = "bottom-right")]
    BottomRight,
    #[serde(rename = "c", alias = "center")]
    #[value(name = "c", alias = "center")]
    Center,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
        Position::Center,
    ];

    /// Short code used on the command line and in config files.
    pub fn code(self) -> &'static str {
        match self {
            Position::TopLeft => "tl",
            Position::TopRight => "tr",
            Position::BottomLeft => "bl",
            Position::BottomRight => "br",
            Position::Center => "c",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Position {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tl" | "top-left" => Ok(Position::TopLeft),
            "tr" | "top-right" => Ok(Position::TopRight),
            "bl" | "bottom-left" => Ok(Position::BottomLeft),
            "br" | "bottom-right" => Ok(Position::BottomRight),
            "c" | "center" => Ok(Position::Center),
            _ => Err(ValidationError::UnknownPosition(s.to_string())),
        }
    }
}

/// Watermark opacity as a percentage (0-100).
///
/// Out-of-range values are rejected, not clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opacity(u8);

impl Opacity {
    pub fn new(percent: u32) -> Result<Self, ValidationError> {
        if percent > 100 {
            return Err(ValidationError::OpacityOutOfRange(percent));
        }
        Ok(Self(percent as u8))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Alpha channel value (0-255) this opacity maps to: `round(p/100 * 255)`.
    pub fn to_alpha(self) -> u8 {
        (self.0 as f32 / 100.0 * 255.0).round() as u8
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(DEFAULT_OPACITY as u8)
    }
}

/// What gets stamped onto each image. Exactly one source is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkSpec {
    Image { path: PathBuf },
    Text { content: String },
}

impl WatermarkSpec {
    /// Build from the two mutually exclusive CLI options.
    pub fn from_options(
        watermark: Option<PathBuf>,
        text: Option<String>,
    ) -> Result<Self, ValidationError> {
        match (watermark, text) {
            (Some(_), Some(_)) => Err(ValidationError::ConflictingWatermark),
            (None, None) => Err(ValidationError::MissingWatermark),
            (Some(path), None) => Ok(WatermarkSpec::Image { path }),
            (None, Some(content)) => {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::EmptyText);
                }
                Ok(WatermarkSpec::Text {
                    content: trimmed.to_string(),
                })
            }
        }
    }
}

/// Where and how strongly the overlay is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementSpec {
    pub position: Position,
    pub opacity: Opacity,
    /// Distance in pixels from the anchored edge(s). Ignored for [`Position::Center`].
    pub margin: u32,
}

impl Default for PlacementSpec {
    fn default() -> Self {
        Self {
            position: Position::default(),
            opacity: Opacity::default(),
            margin: DEFAULT_MARGIN,
        }
    }
}
