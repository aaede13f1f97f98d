//! Integration tests for mask pipelines, debug output and frame sources.

mod common;

use image::DynamicImage;
use parkwatch::detection::motion::build_motion_pipeline;
use parkwatch::detection::occupancy::build_occupancy_pipeline;
use parkwatch::detection::preprocessing::to_gray;
use parkwatch::detection::steps::ThresholdStep;
use parkwatch::{FrameSource, ImageSequence, Pipeline};

use common::*;

#[test]
fn test_pipeline_step_order() {
    assert_eq!(
        build_occupancy_pipeline().step_names(),
        vec!["Gaussian Blur", "Adaptive Threshold", "Median", "Dilate"]
    );
    assert_eq!(
        build_motion_pipeline().step_names(),
        vec!["Gaussian Blur", "Binary Threshold", "Dilate", "Ellipse Close"]
    );
}

#[test]
fn test_run_partial_stops_early() -> anyhow::Result<()> {
    let input = DynamicImage::ImageRgb8(frame_with_square(20, 20, 5, 5, 10));
    let pipeline = Pipeline::new().add_step_boxed(Box::new(ThresholdStep { threshold: 20 }));

    let grayscale = pipeline.run_partial(&input, 0, 0)?;
    let mask = pipeline.run(&input, 0)?;

    assert_eq!(grayscale, to_gray(&input.to_rgb8()));
    assert_eq!(mask.get_pixel(10, 10)[0], 255);
    assert_eq!(mask.get_pixel(0, 0)[0], 0);
    Ok(())
}

#[test]
fn test_debug_output_layout() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");
    let pipeline = build_motion_pipeline().with_debug(debug_dir.clone())?;

    pipeline.run(&DynamicImage::ImageRgb8(black_frame(32, 32)), 7)?;

    let frame_dir = debug_dir.join("00007");
    for name in [
        "00_grayscale.png",
        "01_gaussian_blur.png",
        "02_binary_threshold.png",
        "03_dilate.png",
        "04_ellipse_close.png",
    ] {
        assert!(frame_dir.join(name).is_file(), "missing {}", name);
    }

    // A used debug directory cannot be reused
    assert!(build_motion_pipeline().with_debug(debug_dir).is_err());
    Ok(())
}

#[test]
fn test_image_sequence_plays_in_name_order() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    black_frame(8, 8).save(dir.path().join("frame_002.png"))?;
    frame_with_square(8, 8, 0, 0, 8).save(dir.path().join("frame_001.png"))?;
    std::fs::write(dir.path().join("notes.txt"), "not a frame")?;

    let mut frames = ImageSequence::open(dir.path())?;
    assert_eq!(frames.len(), 2);

    let first = frames.next_frame()?.expect("first frame");
    assert_eq!(first.get_pixel(0, 0).0, [255, 255, 255]);
    let second = frames.next_frame()?.expect("second frame");
    assert_eq!(second.get_pixel(0, 0).0, [0, 0, 0]);
    assert!(frames.next_frame()?.is_none());
    Ok(())
}
