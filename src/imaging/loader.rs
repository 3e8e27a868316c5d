//! Decoding of base images and logo files.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Format detection | `ImageReader::with_guessed_format` (magic bytes, then extension) |
//! | Decode (JPEG, PNG, TIFF, WebP, BMP, GIF) | `image` crate decoders |
//! | EXIF orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//!
//! GIF decoding yields the first frame only. Outputs are re-encoded without
//! EXIF, so the orientation applied here is never applied twice.

use super::backend::ImagingError;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageError, ImageFormat, ImageReader};
use std::path::Path;

/// Extensions (lowercase) this tool reads and writes.
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "tif", "tiff", "bmp", "gif"];

const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Tiff,
    ImageFormat::Bmp,
    ImageFormat::Gif,
];

/// Whether `path` has a supported image extension (case-insensitive).
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Decode the image at `path` and rotate its pixels upright.
pub fn load(path: &Path) -> Result<DynamicImage, ImagingError> {
    if !is_supported(path) {
        return Err(unsupported(path));
    }

    let reader = ImageReader::open(path)?.with_guessed_format()?;
    match reader.format() {
        Some(format) if SUPPORTED_FORMATS.contains(&format) => {}
        _ => return Err(unsupported(path)),
    }

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| classify(path, e))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| classify(path, e))?;
    img.apply_orientation(orientation);
    Ok(img)
}

fn unsupported(path: &Path) -> ImagingError {
    ImagingError::UnsupportedFormat {
        path: path.to_path_buf(),
    }
}

fn classify(path: &Path, err: ImageError) -> ImagingError {
    match err {
        ImageError::Unsupported(_) => unsupported(path),
        other => ImagingError::CorruptFile {
            path: path.to_path_buf(),
            source: other,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{write_jpeg, write_png_rgba};
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(is_supported(Path::new("a.JPG")));
        assert!(is_supported(Path::new("b.Tiff")));
        assert!(is_supported(Path::new("c.tif")));
        assert!(!is_supported(Path::new("d.avif")));
        assert!(!is_supported(Path::new("noext")));
    }

    #[test]
    fn loads_png_with_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("logo.png");
        write_png_rgba(&path, &RgbaImage::from_pixel(10, 6, Rgba([1, 2, 3, 128])));

        let img = load(&path).unwrap();
        assert_eq!(img.dimensions(), (10, 6));
        assert!(img.color().has_alpha());
    }

    #[test]
    fn unsupported_extension_is_rejected_before_io() {
        let err = load(Path::new("/nonexistent/file.avif")).unwrap_err();
        assert!(matches!(err, ImagingError::UnsupportedFormat { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load(Path::new("/nonexistent/file.jpg")).unwrap_err();
        assert!(matches!(err, ImagingError::Io(_)));
    }

    #[test]
    fn garbage_bytes_are_corrupt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ImagingError::CorruptFile { .. }), "{err:?}");
    }

    #[test]
    fn exif_orientation_is_applied() {
        let tmp = tempfile::TempDir::new().unwrap();
        let plain = tmp.path().join("plain.jpg");
        write_jpeg(&plain, 40, 20);

        // Splice an APP1 Exif segment (orientation 6 = rotate 90 CW) after SOI
        let jpeg = std::fs::read(&plain).unwrap();
        let tiff: Vec<u8> = [
            &b"II*\0"[..],
            &8u32.to_le_bytes(),
            &1u16.to_le_bytes(),
            &0x0112u16.to_le_bytes(),
            &3u16.to_le_bytes(),
            &1u32.to_le_bytes(),
            &6u16.to_le_bytes(),
            &[0, 0],
            &0u32.to_le_bytes(),
        ]
        .concat();
        let payload = [&b"Exif\0\0"[..], &tiff].concat();
        let seg_len = (payload.len() + 2) as u16;

        let mut rotated = jpeg[..2].to_vec();
        rotated.extend_from_slice(&[0xFF, 0xE1]);
        rotated.extend_from_slice(&seg_len.to_be_bytes());
        rotated.extend_from_slice(&payload);
        rotated.extend_from_slice(&jpeg[2..]);

        let path = tmp.path().join("rotated.jpg");
        std::fs::write(&path, rotated).unwrap();

        let img = load(&path).unwrap();
        assert_eq!(img.dimensions(), (20, 40));
    }

    #[test]
    fn gif_decodes_first_frame() {
        use image::codecs::gif::GifEncoder;
        use image::{Delay, Frame};

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("anim.gif");
        {
            let file = std::fs::File::create(&path).unwrap();
            let mut encoder = GifEncoder::new(file);
            let red = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]));
            let blue = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255]));
            encoder
                .encode_frames(vec![
                    Frame::from_parts(red, 0, 0, Delay::from_numer_denom_ms(100, 1)),
                    Frame::from_parts(blue, 0, 0, Delay::from_numer_denom_ms(100, 1)),
                ])
                .unwrap();
        }

        let img = load(&path).unwrap().to_rgba8();
        let px = img.get_pixel(4, 4);
        assert!(px[0] > 200 && px[2] < 50, "expected red, got {px:?}");
    }
}
