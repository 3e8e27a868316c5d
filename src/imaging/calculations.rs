//! Pure calculation functions for overlay geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{LogoSizing, TextSizing};
use crate::types::Position;

/// Target width of a logo watermark on a canvas `canvas_width` pixels wide.
///
/// `floor(width_fraction * W)` clamped to `[min_width, max(min_width, floor(max_width_fraction * W))]`.
/// The upper bound never drops below `min_width`, so tiny canvases still get
/// a legible logo (it is fitted to the canvas afterwards).
pub fn logo_target_width(canvas_width: u32, sizing: &LogoSizing) -> u32 {
    let w = canvas_width as f64;
    let target = (w * sizing.width_fraction as f64).floor() as u32;
    let upper = sizing
        .min_width
        .max((w * sizing.max_width_fraction as f64).floor() as u32);
    target.clamp(sizing.min_width, upper)
}

/// Height that keeps the aspect ratio of `source` at `target_width`. Never 0.
pub fn scaled_height(source: (u32, u32), target_width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return 1;
    }
    ((src_h as f64 * target_width as f64 / src_w as f64).floor() as u32).max(1)
}

/// Font size in pixels for text on a canvas `canvas_width` pixels wide.
pub fn font_size(canvas_width: u32, sizing: &TextSizing) -> u32 {
    let size = (canvas_width as f64 * sizing.size_fraction as f64).floor() as u32;
    size.clamp(sizing.min_size, sizing.max_size.max(sizing.min_size))
}

/// Outline thickness for text of the given size.
pub fn stroke_width(font_size: u32) -> u32 {
    (font_size / 20).max(1)
}

/// Drop shadow displacement for text of the given size.
pub fn shadow_offset(font_size: u32) -> u32 {
    (font_size / 14).max(1)
}

/// Scale a pixel's alpha by the overlay alpha target: `round(a * target / 255)`.
pub fn scale_alpha(alpha: u8, target: u8) -> u8 {
    (alpha as f32 * target as f32 / 255.0).round() as u8
}

/// Largest size with the aspect ratio of `size` that fits inside `bounds`.
///
/// Returns `size` unchanged when it already fits. Both dimensions are at least 1.
pub fn fit_within(size: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (w, h) = size;
    let (max_w, max_h) = bounds;
    if w <= max_w && h <= max_h {
        return size;
    }
    let scale = (max_w as f64 / w as f64).min(max_h as f64 / h as f64);
    let fitted_w = ((w as f64 * scale).floor() as u32).clamp(1, max_w.max(1));
    let fitted_h = ((h as f64 * scale).floor() as u32).clamp(1, max_h.max(1));
    (fitted_w, fitted_h)
}

/// Top-left anchor for an overlay of `overlay` size on a `canvas`.
///
/// Corner positions sit `margin` pixels in from both adjacent edges; center
/// ignores the margin. Each axis is then clamped so the overlay stays fully
/// on the canvas (pinned to 0 when it spans the whole axis).
pub fn compute_position(
    canvas: (u32, u32),
    overlay: (u32, u32),
    position: Position,
    margin: u32,
) -> (u32, u32) {
    let (canvas_w, canvas_h) = (canvas.0 as i64, canvas.1 as i64);
    let (overlay_w, overlay_h) = (overlay.0 as i64, overlay.1 as i64);
    let m = margin as i64;

    let (x, y) = match position {
        Position::TopLeft => (m, m),
        Position::TopRight => (canvas_w - overlay_w - m, m),
        Position::BottomLeft => (m, canvas_h - overlay_h - m),
        Position::BottomRight => (canvas_w - overlay_w - m, canvas_h - overlay_h - m),
        Position::Center => ((canvas_w - overlay_w) / 2, (canvas_h - overlay_h) / 2),
    };

    (clamp_axis(x, canvas_w, overlay_w), clamp_axis(y, canvas_h, overlay_h))
}

fn clamp_axis(value: i64, canvas: i64, overlay: i64) -> u32 {
    if overlay >= canvas {
        0
    } else {
        value.clamp(0, canvas - overlay) as u32
    }
}
