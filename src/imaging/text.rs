//! Text watermark rendering.
//!
//! Text is rendered in two steps: a coverage mask of the glyphs (from an
//! outline font through `ab_glyph`, or from the built-in
//! [`bitmap_font`](super::bitmap_font)), then a stamp made of four layers
//! drawn back to front:
//!
//! 1. shadow outline, black, alpha 200, offset by the shadow offset
//! 2. shadow fill, black, alpha 180, same offset
//! 3. outline, black, alpha 220
//! 4. fill, white, alpha 255
//!
//! The outline is the glyph mask dilated by the stroke width.
//!
//! Fonts are resolved once per run by [`GlyphFont::resolve`], which never
//! fails: when no font file loads, the bitmap font is used.

use super::bitmap_font;
use super::calculations::{shadow_offset, stroke_width};
use super::compositor::blend_over;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Font file names tried, in order, when no explicit font is configured.
pub const DEFAULT_FALLBACK_FONTS: &[&str] = &[
    "DejaVuSans.ttf",
    "Arial.ttf",
    "arial.ttf",
    "LiberationSans-Regular.ttf",
];

const SHADOW_STROKE_ALPHA: u8 = 200;
const SHADOW_FILL_ALPHA: u8 = 180;
const STROKE_ALPHA: u8 = 220;
const FILL_ALPHA: u8 = 255;

/// Where to look for a font.
#[derive(Debug, Clone, Default)]
pub struct FontSearch {
    /// Font file tried before anything else.
    pub explicit: Option<PathBuf>,
    /// File names looked up in `dirs`, in order.
    pub fallback_names: Vec<String>,
    /// Directories searched recursively for `fallback_names`.
    pub dirs: Vec<PathBuf>,
}

impl FontSearch {
    /// Search the platform font directories for the default font names.
    pub fn system(explicit: Option<PathBuf>, fallback_names: Vec<String>) -> Self {
        Self {
            explicit,
            fallback_names,
            dirs: system_font_dirs(),
        }
    }
}

/// Platform font directories that exist on this machine.
pub fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/Library/Fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from(r"C:\Windows\Fonts"),
    ];
    if let Some(home) = dirs::home_dir() {
        dirs.push(home.join(".fonts"));
        dirs.push(home.join(".local/share/fonts"));
    }
    if let Some(font_dir) = dirs::font_dir() {
        if !dirs.contains(&font_dir) {
            dirs.push(font_dir);
        }
    }
    dirs.retain(|d| d.is_dir());
    dirs
}

/// A font usable for rendering text watermarks.
pub enum GlyphFont {
    Outline { font: FontVec, path: PathBuf },
    Builtin,
}

impl fmt::Debug for GlyphFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlyphFont::Outline { path, .. } => f.debug_tuple("Outline").field(path).finish(),
            GlyphFont::Builtin => f.write_str("Builtin"),
        }
    }
}

impl GlyphFont {
    /// Load a TrueType/OpenType font file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let data = std::fs::read(path).map_err(|e| e.to_string())?;
        let font = FontVec::try_from_vec(data).map_err(|e| e.to_string())?;
        Ok(GlyphFont::Outline {
            font,
            path: path.to_path_buf(),
        })
    }

    /// First font that loads: the explicit file, then each fallback name
    /// found in the search directories, then the built-in bitmap font.
    pub fn resolve(search: &FontSearch) -> Self {
        if let Some(path) = &search.explicit {
            match Self::from_file(path) {
                Ok(font) => return font,
                Err(e) => warn!(font = %path.display(), error = %e, "Cannot load font"),
            }
        }

        for name in &search.fallback_names {
            for path in find_font_files(name, &search.dirs) {
                match Self::from_file(&path) {
                    Ok(font) => {
                        debug!(font = %path.display(), "Using font");
                        return font;
                    }
                    Err(e) => debug!(font = %path.display(), error = %e, "Skipping font"),
                }
            }
        }

        warn!("No usable font found, falling back to the built-in bitmap font");
        GlyphFont::Builtin
    }

    /// Short description for logs and dry-run output.
    pub fn describe(&self) -> String {
        match self {
            GlyphFont::Outline { path, .. } => path.display().to_string(),
            GlyphFont::Builtin => "built-in bitmap font".to_string(),
        }
    }
}

fn find_font_files(name: &str, dirs: &[PathBuf]) -> Vec<PathBuf> {
    dirs.iter()
        .flat_map(|dir| {
            WalkDir::new(dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file() && e.file_name() == name)
                .map(|e| e.into_path())
        })
        .collect()
}

/// Coverage mask of `text` at `font_size` pixels.
pub fn render_mask(text: &str, font: &GlyphFont, font_size: u32) -> GrayImage {
    match font {
        GlyphFont::Builtin => bitmap_font::render(text, bitmap_font::scale_for(font_size)),
        GlyphFont::Outline { font, .. } => render_outline_mask(text, font, font_size),
    }
}

fn render_outline_mask(text: &str, font: &FontVec, font_size: u32) -> GrayImage {
    let scale = PxScale::from(font_size as f32);
    let scaled = font.as_scaled(scale);

    let mut advance = 0.0f32;
    let mut prev = None;
    let mut placed = Vec::new();
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            advance += scaled.kern(prev, id);
        }
        placed.push((id, advance));
        advance += scaled.h_advance(id);
        prev = Some(id);
    }

    let width = (advance.ceil() as u32).max(1);
    let height = ((scaled.ascent() - scaled.descent()).ceil() as u32).max(1);
    let baseline = scaled.ascent();
    let mut mask = GrayImage::new(width, height);

    for (id, x) in placed {
        let glyph = id.with_scale_and_position(scale, ab_glyph::point(x, baseline));
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = gx as i32 + bounds.min.x as i32;
            let py = gy as i32 + bounds.min.y as i32;
            if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                let pixel = mask.get_pixel_mut(px as u32, py as u32);
                pixel[0] = pixel[0].max(value);
            }
        });
    }
    mask
}

/// Grow a mask by `radius` pixels in every direction (square max filter).
pub fn dilate(mask: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let (w, h) = mask.dimensions();
    let r = radius as i64;

    let horizontal = GrayImage::from_fn(w, h, |x, y| {
        let lo = (x as i64 - r).max(0) as u32;
        let hi = (x as i64 + r).min(w as i64 - 1) as u32;
        Luma([(lo..=hi).map(|sx| mask.get_pixel(sx, y)[0]).max().unwrap_or(0)])
    });
    GrayImage::from_fn(w, h, |x, y| {
        let lo = (y as i64 - r).max(0) as u32;
        let hi = (y as i64 + r).min(h as i64 - 1) as u32;
        Luma([(lo..=hi)
            .map(|sy| horizontal.get_pixel(x, sy)[0])
            .max()
            .unwrap_or(0)])
    })
}

fn pad(mask: &GrayImage, by: u32) -> GrayImage {
    let mut padded = GrayImage::new(mask.width() + 2 * by, mask.height() + 2 * by);
    for (x, y, p) in mask.enumerate_pixels() {
        padded.put_pixel(x + by, y + by, *p);
    }
    padded
}

fn paint(stamp: &mut RgbaImage, mask: &GrayImage, offset: u32, color: [u8; 3], alpha: u8) {
    for (x, y, coverage) in mask.enumerate_pixels() {
        if coverage[0] == 0 {
            continue;
        }
        let a = (coverage[0] as f32 * alpha as f32 / 255.0).round() as u8;
        let src = Rgba([color[0], color[1], color[2], a]);
        blend_over(stamp.get_pixel_mut(x + offset, y + offset), &src);
    }
}

/// Render `text` as a white stamp with a black outline and drop shadow.
///
/// The result is fully opaque where the fill is; opacity is applied by the
/// overlay builder afterwards.
pub fn render_stamp(text: &str, font: &GlyphFont, font_size: u32) -> RgbaImage {
    let stroke = stroke_width(font_size);
    let shadow = shadow_offset(font_size);

    let fill = pad(&render_mask(text, font, font_size), stroke);
    let outline = dilate(&fill, stroke);

    let mut stamp = RgbaImage::new(fill.width() + shadow, fill.height() + shadow);
    paint(&mut stamp, &outline, shadow, [0, 0, 0], SHADOW_STROKE_ALPHA);
    paint(&mut stamp, &fill, shadow, [0, 0, 0], SHADOW_FILL_ALPHA);
    paint(&mut stamp, &outline, 0, [0, 0, 0], STROKE_ALPHA);
    paint(&mut stamp, &fill, 0, [255, 255, 255], FILL_ALPHA);
    stamp
}
