use anyhow::Result;
use image::{DynamicImage, GrayImage, RgbImage};
use std::sync::Arc;
use tracing::debug;

use crate::detection::overlay::{self, CYAN, GREEN, MAGENTA, RED, WHITE};
use crate::detection::steps::*;
use crate::models::{OccupancyResult, Region};
use crate::pipeline::{DebugConfig, Pipeline};

/// Occupancy mask: blur 3×3/σ1, adaptive Gaussian threshold (block 25, C 16,
/// inverted), median 5, one 3×3 dilation.
pub fn build_occupancy_pipeline() -> Pipeline {
    Pipeline::new()
        .add_step(Arc::new(BlurStep { sigma: 1.0 }))
        .add_step(Arc::new(AdaptiveThresholdStep {
            block_size: 25,
            c: 16,
        }))
        .add_step(Arc::new(MedianStep { radius: 2 }))
        .add_step(Arc::new(DilateStep { radius: 1 }))
}

/// Result of classifying one frame
#[derive(Debug, Clone)]
pub struct ParkingReport {
    pub frame: RgbImage,
    /// Regions that passed the bounds check, in layout order
    pub spaces: Vec<OccupancyResult>,
    pub free_count: usize,
}

/// Scores parking regions by counting texture pixels inside each one
#[derive(Clone)]
pub struct OccupancyClassifier {
    pipeline: Pipeline,
}

impl OccupancyClassifier {
    pub fn new() -> Self {
        Self {
            pipeline: build_occupancy_pipeline(),
        }
    }

    pub fn with_debug(mut self, config: DebugConfig) -> Self {
        self.pipeline = self.pipeline.with_debug_config(config);
        self
    }

    /// Binary texture mask for a colour frame
    pub fn mask(&self, frame: &RgbImage, frame_index: u64) -> Result<GrayImage> {
        self.pipeline
            .run(&DynamicImage::ImageRgb8(frame.clone()), frame_index)
    }

    /// Build the mask, score every region and draw the verdicts onto the frame.
    pub fn classify(
        &self,
        mut frame: RgbImage,
        regions: &[Region],
        threshold: u32,
        frame_index: u64,
    ) -> Result<ParkingReport> {
        let mask = self.mask(&frame, frame_index)?;
        let spaces = score_regions(&mask, regions, threshold);
        let free_count = spaces.iter().filter(|s| !s.occupied).count();

        for space in &spaces {
            annotate_space(&mut frame, space);
        }

        debug!(
            frame = frame_index,
            scored = spaces.len(),
            skipped = regions.len() - spaces.len(),
            free = free_count,
            "classified parking regions"
        );

        Ok(ParkingReport {
            frame,
            spaces,
            free_count,
        })
    }
}

impl Default for OccupancyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Score every in-bounds region of `mask`; out-of-bounds regions are skipped.
/// A region is occupied once its active pixel count reaches `threshold`.
pub fn score_regions(mask: &GrayImage, regions: &[Region], threshold: u32) -> Vec<OccupancyResult> {
    let (width, height) = mask.dimensions();
    regions
        .iter()
        .enumerate()
        .filter(|(_, region)| region.fits_within(width, height))
        .map(|(index, region)| {
            let active_pixels = count_active(mask, region);
            OccupancyResult {
                index,
                region: *region,
                active_pixels,
                occupied: active_pixels >= threshold,
            }
        })
        .collect()
}

/// Non-zero pixels of `mask` in `[x, x + w) × [y, y + h)`.
/// The region must already fit within the mask.
pub fn count_active(mask: &GrayImage, region: &Region) -> u32 {
    let mut count = 0;
    for y in region.y..region.y + region.height {
        for x in region.x..region.x + region.width {
            if mask.get_pixel(x as u32, y as u32)[0] != 0 {
                count += 1;
            }
        }
    }
    count
}

fn annotate_space(frame: &mut RgbImage, space: &OccupancyResult) {
    let Region { x, y, width, height } = space.region;

    overlay::draw_text(frame, &space.index.to_string(), x + 5, y + 5, 2, CYAN);

    let color = if space.occupied { RED } else { GREEN };
    overlay::draw_box(frame, x, y, x + width, y + height, color, 2);

    let label = space.active_pixels.to_string();
    let (_, label_height) = overlay::text_size(&label, 2);
    overlay::draw_text_box(
        frame,
        &label,
        x,
        y + height - 3 - label_height as i32,
        2,
        0,
        WHITE,
        MAGENTA,
    );
}
