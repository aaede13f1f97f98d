use image::RgbImage;
use tracing::{debug, warn};

use crate::detection::detector::{class_name, VehicleDetector};
use crate::detection::motion::draw_vehicle_count;
use crate::detection::overlay::{self, GREEN, RED};
use crate::models::{Centroid, CountingLine, Detection};

/// How a crossing centroid is matched against already counted ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DedupPolicy {
    /// Only an identical centroid counts as already seen
    Exact,
    /// Any counted centroid closer than `radius` pixels counts as already seen
    Proximity { radius: f32 },
}

impl DedupPolicy {
    fn already_counted(&self, pool: &[Centroid], centroid: &Centroid) -> bool {
        match self {
            DedupPolicy::Exact => pool.contains(centroid),
            DedupPolicy::Proximity { radius } => {
                pool.iter().any(|seen| seen.distance(centroid) < *radius)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerParams {
    pub line_height: i32,
    pub offset: i32,
    /// Counted centroids with no current detection nearer than this are pruned
    pub prune_tolerance: f32,
    pub dedup: DedupPolicy,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            line_height: 400,
            offset: 10,
            prune_tolerance: 50.0,
            dedup: DedupPolicy::Exact,
        }
    }
}

/// A successfully tracked frame
#[derive(Debug, Clone)]
pub struct TrackedFrame {
    pub frame: RgbImage,
    /// Counted centroids still near a current detection
    pub pool: Vec<Centroid>,
    pub counter: u64,
    pub crossed: usize,
    pub detections: Vec<Detection>,
    pub line: CountingLine,
}

/// Either a tracked frame, or the untouched frame when the detector failed.
/// On failure the caller's pool and counter stay as they were.
#[derive(Debug)]
pub enum DetectorOutcome {
    Tracked(TrackedFrame),
    DetectorFailed { frame: RgbImage, reason: String },
}

/// Counts vehicles from detector boxes
#[derive(Debug, Clone, Default)]
pub struct DetectorTracker {
    params: TrackerParams,
}

impl DetectorTracker {
    pub fn new(params: TrackerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// Run the detector on `frame` and track its output.
    pub fn process(
        &self,
        frame: RgbImage,
        detector: &mut dyn VehicleDetector,
        pool: &[Centroid],
        counter: u64,
    ) -> DetectorOutcome {
        match detector.detect(&frame) {
            Ok(detections) => DetectorOutcome::Tracked(self.track(frame, &detections, pool, counter)),
            Err(e) => {
                warn!("vehicle detector failed: {:#}", e);
                DetectorOutcome::DetectorFailed {
                    frame,
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    /// Count detections whose centroid is inside the band and not already
    /// counted, then prune counted centroids that no current detection is
    /// near any more.
    pub fn track(
        &self,
        mut frame: RgbImage,
        detections: &[Detection],
        pool: &[Centroid],
        counter: u64,
    ) -> TrackedFrame {
        let line = CountingLine::resolve(self.params.line_height, self.params.offset, frame.height());
        overlay::draw_counting_line(&mut frame, line.y, GREEN, 2);

        let mut current = Vec::with_capacity(detections.len());
        for det in detections {
            overlay::draw_box(&mut frame, det.x1, det.y1, det.x2, det.y2, GREEN, 2);
            let centroid = det.centroid();
            overlay::draw_dot(&mut frame, centroid.x, centroid.y, 5, RED);
            let label = format!("{}: {:.2}", class_name(det.label), det.score);
            overlay::draw_text(&mut frame, &label, det.x1, det.y1 - 12, 2, GREEN);
            current.push(centroid);
        }

        let mut counted = pool.to_vec();
        let mut crossed = 0;
        for centroid in &current {
            if line.in_band(centroid.y) && !self.params.dedup.already_counted(&counted, centroid) {
                crossed += 1;
                counted.push(*centroid);
            }
        }

        let tolerance = self.params.prune_tolerance;
        counted.retain(|seen| current.iter().any(|c| seen.distance(c) < tolerance));

        let counter = counter + crossed as u64;
        draw_vehicle_count(&mut frame, counter);

        debug!(
            detections = detections.len(),
            crossed,
            pooled = counted.len(),
            "detector tracking step"
        );

        TrackedFrame {
            frame,
            pool: counted,
            counter,
            crossed,
            detections: detections.to_vec(),
            line,
        }
    }
}
