//! Alpha compositing and format-aware encoding.
//!
//! [`composite`] blends an overlay onto a base with Porter-Duff "over".
//! [`save`] writes the result in the format implied by the output
//! extension, converting the pixel layout to what that format can hold:
//!
//! | Extension | Written as |
//! |---|---|
//! | `jpg`, `jpeg` | RGB flattened over white, quality from config |
//! | `bmp` | RGB flattened over white |
//! | `png`, `webp`, `tif`, `tiff` | RGBA if the base had alpha, else RGB |
//! | `gif` | single indexed frame, NeuQuant palette, binary transparency |

use super::backend::ImagingError;
use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::{BufWriter, Write};
use std::path::Path;

const GIF_QUANTIZE_SPEED: i32 = 10;

/// Blend `layer` onto `base` with its top-left corner at `anchor`.
///
/// Layer pixels falling outside the base are ignored.
pub fn composite(base: &RgbaImage, layer: &RgbaImage, anchor: (u32, u32)) -> RgbaImage {
    let mut out = base.clone();
    let (ax, ay) = anchor;
    for (lx, ly, src) in layer.enumerate_pixels() {
        let (x, y) = (ax + lx, ay + ly);
        if x < out.width() && y < out.height() {
            blend_over(out.get_pixel_mut(x, y), src);
        }
    }
    out
}

/// Porter-Duff "over" for a single pixel, rounded to nearest.
pub(crate) fn blend_over(dst: &mut Rgba<u8>, src: &Rgba<u8>) {
    if src[3] == 0 {
        return;
    }
    let src_a = src[3] as f32 / 255.0;
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    for c in 0..3 {
        let v = (src[c] as f32 * src_a + dst[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

/// Composite every pixel over an opaque background color.
pub fn flatten(image: &RgbaImage, background: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let alpha = a as f32 / 255.0;
        let mix = |c: u8, bg: u8| (c as f32 * alpha + bg as f32 * (1.0 - alpha)).round() as u8;
        Rgb([
            mix(r, background[0]),
            mix(g, background[1]),
            mix(b, background[2]),
        ])
    })
}

/// Encode `image` to `path`, creating parent directories as needed.
pub fn save(
    image: &RgbaImage,
    had_alpha: bool,
    path: &Path,
    quality: Quality,
) -> Result<(), ImagingError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match ext.as_str() {
        "jpg" | "jpeg" => save_jpeg(image, path, quality),
        "bmp" => DynamicImage::ImageRgb8(flatten(image, [255, 255, 255]))
            .save_with_format(path, ImageFormat::Bmp)
            .map_err(|e| ImagingError::encode(path, e)),
        "png" => save_lossless(image, had_alpha, path, ImageFormat::Png),
        "webp" => save_lossless(image, had_alpha, path, ImageFormat::WebP),
        "tif" | "tiff" => save_lossless(image, had_alpha, path, ImageFormat::Tiff),
        "gif" => save_gif(image, path),
        _ => Err(ImagingError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn save_jpeg(image: &RgbaImage, path: &Path, quality: Quality) -> Result<(), ImagingError> {
    let rgb = DynamicImage::ImageRgb8(flatten(image, [255, 255, 255]));
    let file = std::fs::File::create(path).map_err(|e| ImagingError::encode(path, e))?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality.value());
    rgb.write_with_encoder(encoder)
        .map_err(|e| ImagingError::encode(path, e))
}

fn save_lossless(
    image: &RgbaImage,
    had_alpha: bool,
    path: &Path,
    format: ImageFormat,
) -> Result<(), ImagingError> {
    let img = if had_alpha {
        DynamicImage::ImageRgba8(image.clone())
    } else {
        DynamicImage::ImageRgb8(flatten(image, [255, 255, 255]))
    };
    img.save_with_format(path, format)
        .map_err(|e| ImagingError::encode(path, e))
}

/// Quantize to a 256-color palette and write a single GIF frame.
fn save_gif(image: &RgbaImage, path: &Path) -> Result<(), ImagingError> {
    let (width, height) = match (u16::try_from(image.width()), u16::try_from(image.height())) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(ImagingError::encode(
                path,
                format!(
                    "{}x{} exceeds the GIF limit of 65535 pixels per side",
                    image.width(),
                    image.height()
                ),
            ));
        }
    };

    // GIF transparency is one palette index, so alpha becomes all-or-nothing
    let mut pixels = image.as_raw().clone();
    for px in pixels.chunks_exact_mut(4) {
        px[3] = if px[3] < 128 { 0 } else { 255 };
    }
    let frame = gif::Frame::from_rgba_speed(width, height, &mut pixels, GIF_QUANTIZE_SPEED);

    let file = std::fs::File::create(path).map_err(|e| ImagingError::encode(path, e))?;
    let mut writer = BufWriter::new(file);
    {
        let mut encoder = gif::Encoder::new(&mut writer, width, height, &[])
            .map_err(|e| ImagingError::encode(path, e))?;
        encoder
            .write_frame(&frame)
            .map_err(|e| ImagingError::encode(path, e))?;
    }
    writer.flush().map_err(|e| ImagingError::encode(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::loader;

    fn checker(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([200, 40, 40, 255])
            } else {
                Rgba([20, 180, 60, 255])
            }
        })
    }

    // =========================================================================
    // composite tests
    // =========================================================================

    #[test]
    fn transparent_layer_leaves_base_identical() {
        let base = checker(30, 20);
        let layer = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 0]));
        assert_eq!(composite(&base, &layer, (5, 5)), base);
    }

    #[test]
    fn opaque_layer_replaces_pixels() {
        let base = checker(30, 20);
        let layer = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let out = composite(&base, &layer, (10, 10));
        assert_eq!(*out.get_pixel(10, 10), Rgba([1, 2, 3, 255]));
        assert_eq!(*out.get_pixel(13, 13), Rgba([1, 2, 3, 255]));
        assert_eq!(out.get_pixel(14, 14), base.get_pixel(14, 14));
    }

    #[test]
    fn half_alpha_blends_over_opaque_base() {
        let base = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let layer = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 128]));
        let out = composite(&base, &layer, (0, 0));
        assert_eq!(*out.get_pixel(0, 0), Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn layer_outside_base_is_clipped() {
        let base = checker(10, 10);
        let layer = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let out = composite(&base, &layer, (6, 6));
        assert_eq!(out.dimensions(), (10, 10));
        assert_eq!(*out.get_pixel(9, 9), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn blend_over_transparent_base_keeps_source_color() {
        let mut dst = Rgba([0, 0, 0, 0]);
        blend_over(&mut dst, &Rgba([100, 150, 200, 89]));
        assert_eq!(dst, Rgba([100, 150, 200, 89]));
    }

    #[test]
    fn flatten_uses_background_for_transparent_pixels() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        assert_eq!(*flatten(&img, [255, 255, 255]).get_pixel(0, 0), Rgb([255, 255, 255]));
    }

    // =========================================================================
    // save tests
    // =========================================================================

    #[test]
    fn png_keeps_alpha_only_when_base_had_it() {
        let tmp = tempfile::TempDir::new().unwrap();
        let img = RgbaImage::from_pixel(6, 4, Rgba([10, 20, 30, 255]));

        let with = tmp.path().join("with.png");
        save(&img, true, &with, Quality::default()).unwrap();
        assert!(loader::load(&with).unwrap().color().has_alpha());

        let without = tmp.path().join("without.png");
        save(&img, false, &without, Quality::default()).unwrap();
        assert!(!loader::load(&without).unwrap().color().has_alpha());
    }

    #[test]
    fn jpeg_is_rgb_and_creates_parent_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/deeper/out.jpg");
        save(&checker(16, 16), true, &path, Quality::default()).unwrap();

        let reloaded = loader::load(&path).unwrap();
        assert_eq!(reloaded.width(), 16);
        assert!(!reloaded.color().has_alpha());
    }

    #[test]
    fn every_supported_extension_round_trips_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let img = checker(12, 9);
        for ext in loader::SUPPORTED_EXTENSIONS {
            let path = tmp.path().join(format!("out.{ext}"));
            save(&img, false, &path, Quality::default()).unwrap();
            let reloaded = loader::load(&path).unwrap();
            assert_eq!(
                (reloaded.width(), reloaded.height()),
                (12, 9),
                "{ext} changed dimensions"
            );
        }
    }

    #[test]
    fn gif_output_is_single_frame() {
        use image::AnimationDecoder;
        use image::codecs::gif::GifDecoder;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.gif");
        let img = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]));
        save(&img, false, &path, Quality::default()).unwrap();

        let file = std::io::BufReader::new(std::fs::File::open(&path).unwrap());
        let frames = GifDecoder::new(file)
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap();
        assert_eq!(frames.len(), 1);
        let px = frames[0].buffer().get_pixel(3, 3);
        assert!(px[0] > 200 && px[1] < 50, "expected red, got {px:?}");
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = save(&checker(2, 2), false, &tmp.path().join("x.avif"), Quality::default())
            .unwrap_err();
        assert!(matches!(err, ImagingError::UnsupportedFormat { .. }));
    }

    #[test]
    fn unwritable_target_is_an_encode_error_naming_the_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        for name in ["taken.jpg", "taken.gif"] {
            // A directory where the file should go
            let path = tmp.path().join(name);
            std::fs::create_dir(&path).unwrap();

            let err = save(&checker(4, 4), false, &path, Quality::default()).unwrap_err();
            match err {
                ImagingError::Encode { path: failed, .. } => assert_eq!(failed, path),
                other => panic!("{name}: expected Encode, got {other:?}"),
            }
        }
    }
}
