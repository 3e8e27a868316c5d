//! Image processing: pure Rust, statically linked.
//!
//! | Stage | Module |
//! |---|---|
//! | **Load** (decode, EXIF orientation, first GIF frame) | [`loader`] |
//! | **Overlay** (logo resize or text stamp, fit, opacity, anchor) | [`overlay`] |
//! | **Composite + encode** (Porter-Duff over, per-format conversion) | [`compositor`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for overlay geometry (unit testable)
//! - **Parameters**: Sizing rules and encode quality
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`], the run driver's I/O seam
//! - **Text**: font resolution and text stamp rendering, with a bitmap fallback font

pub mod backend;
mod bitmap_font;
mod calculations;
pub mod compositor;
pub mod loader;
pub mod overlay;
mod params;
pub mod rust_backend;
pub mod text;

pub use backend::{ImageBackend, ImagingError};
pub use compositor::composite;
pub use loader::{SUPPORTED_EXTENSIONS, is_supported};
pub use overlay::{Overlay, PreparedWatermark};
pub use params::{LogoSizing, Quality, Sizing, TextSizing};
pub use rust_backend::RustBackend;
pub use text::{DEFAULT_FALLBACK_FONTS, FontSearch, GlyphFont};
