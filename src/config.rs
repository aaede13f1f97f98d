use serde::{Deserialize, Serialize};

use crate::detection::{DedupPolicy, MotionParams, PoolLimits, TrackerParams, VehicleFilter};

pub const DEFAULT_CONFIDENCE: f32 = 0.6;
pub const DEFAULT_THRESHOLD: u32 = 500;
pub const MIN_CONTOUR_SIZE: u32 = 40;
pub const DEFAULT_OFFSET: i32 = 10;
pub const DEFAULT_LINE_HEIGHT: i32 = 400;

/// Tunables shared by all analysis modes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Active pixels at which a parking space counts as occupied
    pub parking_threshold: u32,
    pub min_contour_width: u32,
    pub min_contour_height: u32,
    /// Configured counting line row; clamped per frame
    pub line_height: i32,
    /// Half-height of the crossing band
    pub offset: i32,
    pub ml_confidence: f32,
    /// Analyse every n-th frame
    pub frame_skip: u32,
    pub pool_max_age: Option<u32>,
    pub pool_max_len: Option<usize>,
    pub prune_tolerance: f32,
    /// `None` keeps exact-match dedup, `Some(r)` matches within `r` pixels
    pub dedup_radius: Option<f32>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        let limits = PoolLimits::default();
        Self {
            parking_threshold: DEFAULT_THRESHOLD,
            min_contour_width: MIN_CONTOUR_SIZE,
            min_contour_height: MIN_CONTOUR_SIZE,
            line_height: DEFAULT_LINE_HEIGHT,
            offset: DEFAULT_OFFSET,
            ml_confidence: DEFAULT_CONFIDENCE,
            frame_skip: 1,
            pool_max_age: limits.max_age,
            pool_max_len: limits.max_len,
            prune_tolerance: 50.0,
            dedup_radius: None,
        }
    }
}

impl AnalysisSettings {
    pub fn motion_params(&self) -> MotionParams {
        MotionParams {
            min_width: self.min_contour_width,
            min_height: self.min_contour_height,
            line_height: self.line_height,
            offset: self.offset,
            limits: PoolLimits {
                max_age: self.pool_max_age,
                max_len: self.pool_max_len,
            },
        }
    }

    pub fn tracker_params(&self) -> TrackerParams {
        TrackerParams {
            line_height: self.line_height,
            offset: self.offset,
            prune_tolerance: self.prune_tolerance,
            dedup: match self.dedup_radius {
                Some(radius) => DedupPolicy::Proximity { radius },
                None => DedupPolicy::Exact,
            },
        }
    }

    pub fn vehicle_filter(&self) -> VehicleFilter {
        VehicleFilter::new(self.ml_confidence)
    }
}
