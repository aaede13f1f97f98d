use anyhow::{bail, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use std::sync::Arc;
use tracing::debug;

use crate::detection::contours;
use crate::detection::overlay::{self, BLUE, COUNT_GREEN, GREEN, WHITE};
use crate::detection::preprocessing::{self, sigma_for_kernel};
use crate::detection::steps::*;
use crate::models::{Centroid, Contour, CountingLine};
use crate::pipeline::{DebugConfig, Pipeline};

/// Motion mask over a frame difference: blur 5×5, threshold 20, 3×3 dilation,
/// 2×2 elliptical closing.
pub fn build_motion_pipeline() -> Pipeline {
    Pipeline::new()
        .add_step(Arc::new(BlurStep {
            sigma: sigma_for_kernel(5),
        }))
        .add_step(Arc::new(ThresholdStep { threshold: 20 }))
        .add_step(Arc::new(DilateStep { radius: 1 }))
        .add_step(Arc::new(EllipseCloseStep))
}

/// A centroid waiting to cross the line, with the number of frames it has
/// been carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PooledCentroid {
    pub centroid: Centroid,
    pub age: u32,
}

/// Bounds on how long uncounted centroids are carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    /// Entries carried for more than this many frames are dropped
    pub max_age: Option<u32>,
    /// Oldest entries are dropped beyond this size
    pub max_len: Option<usize>,
}

impl PoolLimits {
    pub fn unbounded() -> Self {
        Self {
            max_age: None,
            max_len: None,
        }
    }
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_age: Some(50),
            max_len: Some(256),
        }
    }
}

/// Centroids seen by the motion tracker that have not crossed the line yet.
/// Entries are kept oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionPool {
    entries: Vec<PooledCentroid>,
}

impl MotionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool of fresh (age 0) centroids
    pub fn from_centroids(centroids: impl IntoIterator<Item = Centroid>) -> Self {
        Self {
            entries: centroids
                .into_iter()
                .map(|centroid| PooledCentroid { centroid, age: 0 })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PooledCentroid] {
        &self.entries
    }

    pub fn centroids(&self) -> Vec<Centroid> {
        self.entries.iter().map(|e| e.centroid).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn age_all(&mut self) {
        for entry in &mut self.entries {
            entry.age = entry.age.saturating_add(1);
        }
    }

    fn push(&mut self, centroid: Centroid) {
        self.entries.push(PooledCentroid { centroid, age: 0 });
    }

    /// Drop entries that outlived `limits`; returns how many were evicted.
    pub fn evict(&mut self, limits: &PoolLimits) -> usize {
        let before = self.entries.len();
        if let Some(max_age) = limits.max_age {
            self.entries.retain(|e| e.age <= max_age);
        }
        if let Some(max_len) = limits.max_len {
            if self.entries.len() > max_len {
                let excess = self.entries.len() - max_len;
                self.entries.drain(..excess);
            }
        }
        before - self.entries.len()
    }
}

/// Remove every pooled centroid inside the crossing band.
/// Returns how many crossed; those never remain in the pool.
pub fn count_crossings(pool: &mut MotionPool, line: &CountingLine) -> usize {
    let before = pool.entries.len();
    pool.entries.retain(|e| !line.in_band(e.centroid.y));
    before - pool.entries.len()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionParams {
    pub min_width: u32,
    pub min_height: u32,
    pub line_height: i32,
    pub offset: i32,
    pub limits: PoolLimits,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            min_width: 40,
            min_height: 40,
            line_height: 400,
            offset: 10,
            limits: PoolLimits::default(),
        }
    }
}

/// Output of one motion-tracking step
#[derive(Debug, Clone)]
pub struct MotionReport {
    /// The earlier frame with line, boxes, centroids and count drawn on it
    pub frame: RgbImage,
    pub pool: MotionPool,
    pub counter: u64,
    /// Centroids counted in this call
    pub crossed: usize,
    /// Contours that passed the size filter
    pub objects: Vec<Contour>,
    pub evicted: usize,
    pub line: CountingLine,
}

/// Counts vehicles by differencing consecutive frames
#[derive(Clone)]
pub struct MotionTracker {
    pipeline: Pipeline,
    params: MotionParams,
}

impl MotionTracker {
    pub fn new(params: MotionParams) -> Self {
        Self {
            pipeline: build_motion_pipeline(),
            params,
        }
    }

    pub fn with_debug(mut self, config: DebugConfig) -> Self {
        self.pipeline = self.pipeline.with_debug_config(config);
        self
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    /// Binary motion mask between two frames of identical size
    pub fn motion_mask(&self, prev: &RgbImage, curr: &RgbImage, frame_index: u64) -> Result<GrayImage> {
        if prev.dimensions() != curr.dimensions() {
            bail!(
                "frame size changed from {:?} to {:?}",
                prev.dimensions(),
                curr.dimensions()
            );
        }
        let diff = preprocessing::abs_diff(prev, curr);
        self.pipeline.run(&DynamicImage::ImageRgb8(diff), frame_index)
    }

    /// Size-filtered moving objects in a motion mask
    pub fn moving_objects(&self, mask: &GrayImage) -> Vec<Contour> {
        contours::filter_by_size(
            contours::find_contours(mask),
            self.params.min_width,
            self.params.min_height,
        )
    }

    /// One tracking step. New centroids join the carried pool, every pooled
    /// centroid inside the band is counted once and dropped, then the pool
    /// limits are applied to what is left.
    pub fn track(
        &self,
        mut prev: RgbImage,
        curr: &RgbImage,
        mut pool: MotionPool,
        counter: u64,
        frame_index: u64,
    ) -> Result<MotionReport> {
        let mask = self.motion_mask(&prev, curr, frame_index)?;
        let objects = self.moving_objects(&mask);

        let line = CountingLine::resolve(self.params.line_height, self.params.offset, prev.height());
        overlay::draw_counting_line(&mut prev, line.y, GREEN, 2);

        pool.age_all();
        for object in &objects {
            overlay::draw_box(
                &mut prev,
                object.min_x as i32 - 10,
                object.min_y as i32 - 10,
                object.max_x as i32 + 10,
                object.max_y as i32 + 10,
                BLUE,
                2,
            );
            let centroid = object.centroid();
            overlay::draw_dot(&mut prev, centroid.x, centroid.y, 5, GREEN);
            pool.push(centroid);
        }

        let crossed = count_crossings(&mut pool, &line);
        let evicted = pool.evict(&self.params.limits);
        let counter = counter + crossed as u64;

        draw_vehicle_count(&mut prev, counter);

        debug!(
            frame = frame_index,
            objects = objects.len(),
            crossed,
            evicted,
            pooled = pool.len(),
            "motion tracking step"
        );

        Ok(MotionReport {
            frame: prev,
            pool,
            counter,
            crossed,
            objects,
            evicted,
            line,
        })
    }
}

impl Default for MotionTracker {
    fn default() -> Self {
        Self::new(MotionParams::default())
    }
}

/// Running count label in the top-left corner.
pub fn draw_vehicle_count(frame: &mut RgbImage, counter: u64) {
    overlay::draw_text_box(
        frame,
        &format!("Vehicle Count: {}", counter),
        10,
        10,
        3,
        8,
        WHITE,
        COUNT_GREEN,
    );
}
