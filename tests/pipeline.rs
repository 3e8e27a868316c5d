//! End-to-end tests of the library API: plan a batch, run it with the
//! pure Rust backend, and inspect the files it writes.
//!
//! All images are synthesized with the `image` crate inside a temp dir.

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use watermarker::imaging::{FontSearch, PreparedWatermark};
use watermarker::plan::{self, InputKind, PlanRequest};
use watermarker::run::{self, RunOptions};
use watermarker::types::{Opacity, PlacementSpec, Position, WatermarkSpec};

fn workspace() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    (tmp, root)
}

fn write_rgb(path: &Path, img: &RgbImage) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save(path).unwrap();
}

fn write_rgba(path: &Path, img: &RgbaImage) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save(path).unwrap();
}

fn solid(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
}

fn logo(root: &Path) -> PathBuf {
    let path = root.join("logo.png");
    write_rgba(
        &path,
        &RgbaImage::from_pixel(32, 16, Rgba([255, 0, 0, 255])),
    );
    path
}

fn placement(position: Position, opacity: u32) -> PlacementSpec {
    PlacementSpec {
        position,
        opacity: Opacity::new(opacity).unwrap(),
        ..PlacementSpec::default()
    }
}

#[test]
fn recursive_folder_batch_writes_mirrored_outputs() {
    let (_tmp, root) = workspace();
    write_rgb(&root.join("photos/a.jpg"), &solid(120, 80, 200));
    write_rgba(
        &root.join("photos/sub/b.png"),
        &RgbaImage::from_pixel(90, 60, Rgba([10, 20, 30, 255])),
    );
    let logo = logo(&root);

    let request = PlanRequest {
        recursive: true,
        ..PlanRequest::new("photos", &root)
    };
    let plan = plan::plan(&request).unwrap();
    assert_eq!(plan.kind, InputKind::Folder);
    assert_eq!(plan.output_root, root.join("watermarked"));

    let watermark = PreparedWatermark::prepare(
        &WatermarkSpec::Image { path: logo },
        &FontSearch::default(),
    )
    .unwrap();
    let result = run::run(
        &plan,
        &watermark,
        &placement(Position::BottomRight, 35),
        &RunOptions::default(),
        None,
    );

    assert_eq!((result.processed, result.skipped, result.failed), (2, 0, 0));
    let a = image::open(root.join("watermarked/a_watermarked.jpg")).unwrap();
    let b = image::open(root.join("watermarked/sub/b_watermarked.png")).unwrap();
    assert_eq!((a.width(), a.height()), (120, 80));
    assert_eq!((b.width(), b.height()), (90, 60));
}

#[test]
fn zero_opacity_leaves_pixels_unchanged() {
    let (_tmp, root) = workspace();
    let base = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8 * 3, y as u8 * 5, 77]));
    write_rgb(&root.join("in.png"), &base);
    let logo = logo(&root);

    let plan = plan::plan(&PlanRequest::new("in.png", &root)).unwrap();
    let watermark = PreparedWatermark::prepare(
        &WatermarkSpec::Image { path: logo },
        &FontSearch::default(),
    )
    .unwrap();
    let result = run::run(
        &plan,
        &watermark,
        &placement(Position::Center, 0),
        &RunOptions::default(),
        None,
    );
    assert_eq!(result.processed, 1);

    let out = image::open(root.join("in_watermarked.png")).unwrap().to_rgb8();
    assert_eq!(out, base);
}

#[test]
fn text_watermark_lands_bottom_right() {
    let (_tmp, root) = workspace();
    let base = solid(400, 200, 90);
    write_rgb(&root.join("shot.png"), &base);

    let plan = plan::plan(&PlanRequest::new("shot.png", &root)).unwrap();
    let watermark = PreparedWatermark::prepare(
        &WatermarkSpec::Text {
            content: "(c) ACME".into(),
        },
        &FontSearch::default(),
    )
    .unwrap();
    let result = run::run(
        &plan,
        &watermark,
        &placement(Position::BottomRight, 40),
        &RunOptions::default(),
        None,
    );
    assert_eq!(result.processed, 1);

    let out = image::open(root.join("shot_watermarked.png")).unwrap().to_rgb8();
    let changed = |x0: u32, y0: u32, x1: u32, y1: u32| {
        (y0..y1).any(|y| (x0..x1).any(|x| out.get_pixel(x, y) != base.get_pixel(x, y)))
    };
    assert!(changed(200, 100, 400, 200), "bottom-right quadrant untouched");
    assert!(!changed(0, 0, 200, 100), "top-left quadrant modified");
    // Margin strip along the right and bottom edges stays clean
    assert!(!changed(400 - 20, 0, 400, 200));
    assert!(!changed(0, 200 - 20, 400, 200));
}

#[test]
fn dry_run_writes_nothing() {
    let (_tmp, root) = workspace();
    write_rgb(&root.join("photos/a.jpg"), &solid(40, 30, 100));
    write_rgb(&root.join("photos/b.jpg"), &solid(40, 30, 100));

    let plan = plan::plan(&PlanRequest::new("photos", &root)).unwrap();
    let watermark = PreparedWatermark::prepare(
        &WatermarkSpec::Text {
            content: "draft".into(),
        },
        &FontSearch::default(),
    )
    .unwrap();
    let options = RunOptions {
        dry_run: true,
        ..RunOptions::default()
    };
    let result = run::run(&plan, &watermark, &PlacementSpec::default(), &options, None);

    assert!(result.dry_run);
    assert_eq!(result.processed, 2);
    assert!(!root.join("watermarked").exists());
}

#[test]
fn second_run_without_overwrite_picks_new_names() {
    let (_tmp, root) = workspace();
    write_rgb(&root.join("photos/a.jpg"), &solid(40, 30, 100));
    let watermark = PreparedWatermark::prepare(
        &WatermarkSpec::Text {
            content: "x".into(),
        },
        &FontSearch::default(),
    )
    .unwrap();
    let request = PlanRequest::new("photos", &root);

    let first = plan::plan(&request).unwrap();
    assert_eq!(first, plan::plan(&request).unwrap());
    run::run(
        &first,
        &watermark,
        &PlacementSpec::default(),
        &RunOptions::default(),
        None,
    );

    let second = plan::plan(&request).unwrap();
    assert_eq!(
        second.items[0].output,
        root.join("watermarked/a_watermarked_watermarked.jpg")
    );

    let overwriting = plan::plan(&PlanRequest {
        overwrite: true,
        ..request.clone()
    })
    .unwrap();
    assert_eq!(overwriting.items[0].output, first.items[0].output);
}

#[test]
fn corrupt_input_is_reported_and_batch_continues() {
    let (_tmp, root) = workspace();
    write_rgb(&root.join("photos/good.png"), &solid(40, 30, 100));
    std::fs::write(root.join("photos/bad.png"), b"not a png").unwrap();

    let plan = plan::plan(&PlanRequest::new("photos", &root)).unwrap();
    let watermark = PreparedWatermark::prepare(
        &WatermarkSpec::Text {
            content: "x".into(),
        },
        &FontSearch::default(),
    )
    .unwrap();
    let result = run::run(
        &plan,
        &watermark,
        &PlacementSpec::default(),
        &RunOptions::default(),
        None,
    );

    assert_eq!((result.processed, result.failed), (1, 1));
    assert!(result.failures[0].input.ends_with("bad.png"));
    assert!(root.join("watermarked/good_watermarked.png").exists());
}

#[test]
fn animated_gif_keeps_only_its_first_frame() {
    use image::codecs::gif::{GifDecoder, GifEncoder};
    use image::{AnimationDecoder, Frame};

    let (_tmp, root) = workspace();
    let input = root.join("anim.gif");
    {
        let file = std::fs::File::create(&input).unwrap();
        let mut encoder = GifEncoder::new(file);
        encoder
            .encode_frames(vec![
                Frame::new(RgbaImage::from_pixel(80, 60, Rgba([255, 0, 0, 255]))),
                Frame::new(RgbaImage::from_pixel(80, 60, Rgba([0, 0, 255, 255]))),
            ])
            .unwrap();
    }
    let logo = logo(&root);

    let plan = plan::plan(&PlanRequest::new("anim.gif", &root)).unwrap();
    let watermark = PreparedWatermark::prepare(
        &WatermarkSpec::Image { path: logo },
        &FontSearch::default(),
    )
    .unwrap();
    let result = run::run(
        &plan,
        &watermark,
        &placement(Position::BottomRight, 100),
        &RunOptions::default(),
        None,
    );
    assert_eq!(result.processed, 1);

    let file = std::io::BufReader::new(std::fs::File::open(root.join("anim_watermarked.gif")).unwrap());
    let frames = GifDecoder::new(file)
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap();
    assert_eq!(frames.len(), 1);
    let buffer = frames[0].buffer();
    assert_eq!(buffer.dimensions(), (80, 60));
    // Top-left corner is far from the logo and still shows frame 0
    let px = buffer.get_pixel(2, 2);
    assert!(px[0] > 200 && px[2] < 50, "expected red, got {px:?}");
}
