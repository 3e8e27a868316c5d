//! Pure Rust image backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP, GIF) | `image` crate, see [`loader`](super::loader) |
//! | EXIF orientation | `image::metadata::Orientation` |
//! | Encode JPEG | `image::codecs::jpeg::JpegEncoder` with configurable quality |
//! | Encode PNG, TIFF, WebP, BMP | `DynamicImage::save_with_format` |
//! | Encode GIF | `gif` crate, NeuQuant palette quantization |

use super::backend::{ImageBackend, ImagingError};
use super::params::Quality;
use super::{compositor, loader};
use image::{DynamicImage, RgbaImage};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend {
    pub jpeg_quality: Quality,
}

impl RustBackend {
    pub fn new(jpeg_quality: Quality) -> Self {
        Self { jpeg_quality }
    }
}

impl ImageBackend for RustBackend {
    fn load(&self, path: &Path) -> Result<DynamicImage, ImagingError> {
        loader::load(path)
    }

    fn save(&self, image: &RgbaImage, had_alpha: bool, path: &Path) -> Result<(), ImagingError> {
        compositor::save(image, had_alpha, path, self.jpeg_quality)
    }
}
