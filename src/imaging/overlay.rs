//! Overlay building: from a watermark and a canvas size to a positioned,
//! alpha-scaled layer ready for [`composite`](super::compositor::composite).
//!
//! The watermark source is decoded or resolved once per run
//! ([`PreparedWatermark::prepare`]); [`build`] then runs per image because
//! the overlay size depends on the canvas width.

use super::calculations::{
    compute_position, fit_within, font_size, logo_target_width, scale_alpha, scaled_height,
};
use super::loader;
use super::params::Sizing;
use super::text::{self, FontSearch, GlyphFont};
use crate::types::{PlacementSpec, ValidationError, WatermarkSpec};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use tracing::debug;

/// A watermark source ready to be stamped on any number of images.
#[derive(Debug)]
pub enum PreparedWatermark {
    Logo(RgbaImage),
    Text { content: String, font: GlyphFont },
}

impl PreparedWatermark {
    /// Check the watermark source without decoding anything: the logo file
    /// must exist and text must not be blank.
    pub fn check(spec: &WatermarkSpec) -> Result<(), ValidationError> {
        match spec {
            WatermarkSpec::Image { path } if !path.is_file() => {
                Err(ValidationError::WatermarkNotFound(path.clone()))
            }
            WatermarkSpec::Text { content } if content.trim().is_empty() => {
                Err(ValidationError::EmptyText)
            }
            _ => Ok(()),
        }
    }

    /// Decode the logo or resolve the font for text.
    ///
    /// A missing or undecodable logo is a validation error: it would fail
    /// every item, so the run does not start.
    pub fn prepare(spec: &WatermarkSpec, fonts: &FontSearch) -> Result<Self, ValidationError> {
        Self::check(spec)?;
        match spec {
            WatermarkSpec::Image { path } => {
                let logo = loader::load(path).map_err(|source| ValidationError::WatermarkImage {
                    path: path.clone(),
                    source,
                })?;
                debug!(logo = %path.display(), width = logo.width(), height = logo.height(), "Loaded logo");
                Ok(PreparedWatermark::Logo(logo.to_rgba8()))
            }
            WatermarkSpec::Text { content } => {
                let font = GlyphFont::resolve(fonts);
                debug!(font = %font.describe(), "Resolved text font");
                Ok(PreparedWatermark::Text {
                    content: content.trim().to_string(),
                    font,
                })
            }
        }
    }
}

/// An overlay layer and the canvas coordinate of its top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub layer: RgbaImage,
    pub anchor: (u32, u32),
}

/// Build the overlay for a canvas of `canvas` size.
///
/// The stamp is sized from the canvas width, shrunk to fit the canvas if it
/// is still larger, alpha-scaled by the placement opacity and anchored.
pub fn build(
    watermark: &PreparedWatermark,
    canvas: (u32, u32),
    placement: &PlacementSpec,
    sizing: &Sizing,
) -> Overlay {
    let (canvas_w, _) = canvas;

    let mut layer = match watermark {
        PreparedWatermark::Logo(logo) => {
            let width = logo_target_width(canvas_w, &sizing.logo);
            let sized = (width, scaled_height(logo.dimensions(), width));
            let (w, h) = fit_within(sized, canvas);
            if (w, h) != sized {
                debug!(from = ?sized, to = ?(w, h), "Logo larger than canvas, scaling down");
            }
            imageops::resize(logo, w, h, FilterType::Lanczos3)
        }
        PreparedWatermark::Text { content, font } => {
            let stamp = text::render_stamp(content, font, font_size(canvas_w, &sizing.text));
            let fitted = fit_within(stamp.dimensions(), canvas);
            if fitted != stamp.dimensions() {
                debug!(from = ?stamp.dimensions(), to = ?fitted, "Text larger than canvas, scaling down");
                imageops::resize(&stamp, fitted.0, fitted.1, FilterType::Lanczos3)
            } else {
                stamp
            }
        }
    };

    let target = placement.opacity.to_alpha();
    for pixel in layer.pixels_mut() {
        pixel[3] = scale_alpha(pixel[3], target);
    }

    let anchor = compute_position(
        canvas,
        layer.dimensions(),
        placement.position,
        placement.margin,
    );
    Overlay { layer, anchor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_png_rgba;
    use crate::types::{Opacity, Position};
    use image::Rgba;

    fn opaque_logo(width: u32, height: u32) -> PreparedWatermark {
        PreparedWatermark::Logo(RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255])))
    }

    fn placement(position: Position, opacity: u32) -> PlacementSpec {
        PlacementSpec {
            position,
            opacity: Opacity::new(opacity).unwrap(),
            margin: 24,
        }
    }

    #[test]
    fn logo_is_a_fifth_of_canvas_width() {
        let overlay = build(
            &opaque_logo(400, 200),
            (1000, 800),
            &placement(Position::BottomRight, 100),
            &Sizing::default(),
        );
        assert_eq!(overlay.layer.dimensions(), (200, 100));
        assert_eq!(overlay.anchor, (1000 - 200 - 24, 800 - 100 - 24));
    }

    #[test]
    fn opacity_100_keeps_authored_alpha() {
        let logo = PreparedWatermark::Logo(RgbaImage::from_pixel(
            100,
            100,
            Rgba([255, 255, 255, 255]),
        ));
        let overlay = build(
            &logo,
            (500, 500),
            &placement(Position::TopLeft, 100),
            &Sizing::default(),
        );
        let center = overlay.layer.get_pixel(50, 50);
        assert_eq!(center[3], 255);
    }

    #[test]
    fn opacity_scales_every_alpha() {
        let overlay = build(
            &opaque_logo(100, 100),
            (500, 500),
            &placement(Position::Center, 35),
            &Sizing::default(),
        );
        let center = overlay.layer.get_pixel(50, 50);
        assert_eq!(center[3], 89);
    }

    #[test]
    fn opacity_zero_is_fully_transparent() {
        let watermark = PreparedWatermark::Text {
            content: "(c) ACME".into(),
            font: GlyphFont::Builtin,
        };
        let overlay = build(
            &watermark,
            (640, 480),
            &placement(Position::BottomRight, 0),
            &Sizing::default(),
        );
        assert!(overlay.layer.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn oversized_overlay_is_scaled_to_fit() {
        // Tiny canvas: logo width floors at 48, wider than the 30px canvas
        let overlay = build(
            &opaque_logo(100, 50),
            (30, 30),
            &placement(Position::BottomRight, 100),
            &Sizing::default(),
        );
        let (w, h) = overlay.layer.dimensions();
        assert!(w <= 30 && h <= 30, "{w}x{h} exceeds canvas");
        assert_eq!(overlay.anchor.0, 0);
    }

    #[test]
    fn text_overlay_sits_inside_canvas_for_every_position() {
        let watermark = PreparedWatermark::Text {
            content: "Sample".into(),
            font: GlyphFont::Builtin,
        };
        for position in Position::ALL {
            let overlay = build(
                &watermark,
                (400, 300),
                &placement(position, 40),
                &Sizing::default(),
            );
            let (w, h) = overlay.layer.dimensions();
            assert!(overlay.anchor.0 + w <= 400, "{position} overflows x");
            assert!(overlay.anchor.1 + h <= 300, "{position} overflows y");
        }
    }

    #[test]
    fn prepare_rejects_missing_logo() {
        let spec = WatermarkSpec::Image {
            path: "/nonexistent/logo.png".into(),
        };
        assert!(matches!(
            PreparedWatermark::prepare(&spec, &FontSearch::default()),
            Err(ValidationError::WatermarkNotFound(_))
        ));
    }

    #[test]
    fn prepare_rejects_undecodable_logo() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("logo.png");
        std::fs::write(&path, b"not a png").unwrap();

        let spec = WatermarkSpec::Image { path };
        assert!(matches!(
            PreparedWatermark::prepare(&spec, &FontSearch::default()),
            Err(ValidationError::WatermarkImage { .. })
        ));
    }

    #[test]
    fn prepare_decodes_logo_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("logo.png");
        write_png_rgba(&path, &RgbaImage::from_pixel(64, 32, Rgba([0, 0, 0, 200])));

        let prepared =
            PreparedWatermark::prepare(&WatermarkSpec::Image { path }, &FontSearch::default())
                .unwrap();
        match prepared {
            PreparedWatermark::Logo(logo) => assert_eq!(logo.dimensions(), (64, 32)),
            other => panic!("expected logo, got {other:?}"),
        }
    }

    #[test]
    fn prepare_text_without_fonts_uses_builtin() {
        let spec = WatermarkSpec::Text {
            content: "  ACME ".into(),
        };
        let prepared = PreparedWatermark::prepare(&spec, &FontSearch::default()).unwrap();
        match prepared {
            PreparedWatermark::Text { content, font } => {
                assert_eq!(content, "ACME");
                assert!(matches!(font, GlyphFont::Builtin));
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn tall_logo_is_fitted_to_canvas_height() {
        // 200px wide target on a 1000x300 canvas makes a 200x800 logo
        let overlay = build(
            &opaque_logo(50, 200),
            (1000, 300),
            &placement(Position::TopLeft, 100),
            &Sizing::default(),
        );
        assert_eq!(overlay.layer.dimensions(), (75, 300));
        assert_eq!(overlay.anchor, (24, 0));
    }

    #[test]
    fn check_accepts_existing_logo_without_decoding_it() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("logo.png");
        std::fs::write(&path, b"not a png").unwrap();

        assert!(PreparedWatermark::check(&WatermarkSpec::Image { path }).is_ok());
    }

    #[test]
    fn check_rejects_missing_logo_and_blank_text() {
        let missing = WatermarkSpec::Image {
            path: "/nonexistent/logo.png".into(),
        };
        let blank = WatermarkSpec::Text {
            content: "   ".into(),
        };
        assert!(matches!(
            PreparedWatermark::check(&missing),
            Err(ValidationError::WatermarkNotFound(_))
        ));
        assert!(matches!(
            PreparedWatermark::check(&blank),
            Err(ValidationError::EmptyText)
        ));
    }
}
