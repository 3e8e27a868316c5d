//! Image backend trait and the imaging error type.
//!
//! The [`ImageBackend`] trait is the seam between the run driver and the
//! pixel work: it loads a base image and saves a composited one. Overlay
//! building and compositing are pure functions over in-memory buffers, so
//! only the two I/O edges go through the trait.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use
//! [`tests::MockBackend`], which fabricates images and records saves.

use image::{DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Unsupported image format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("Cannot decode {}", path.display())]
    CorruptFile {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot encode {}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ImagingError {
    pub(crate) fn encode(
        path: &Path,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ImagingError::Encode {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

/// Load and save operations used by the run driver.
pub trait ImageBackend {
    /// Decode an image with its EXIF orientation applied.
    fn load(&self, path: &Path) -> Result<DynamicImage, ImagingError>;

    /// Encode `image` to `path`, choosing the format from the extension.
    ///
    /// `had_alpha` tells lossless formats whether the base image carried an
    /// alpha channel worth keeping.
    fn save(&self, image: &RgbaImage, had_alpha: bool, path: &Path) -> Result<(), ImagingError>;
}
