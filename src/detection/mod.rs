pub mod preprocessing;
pub mod contours;
pub mod overlay;
pub mod steps;
pub mod occupancy;
pub mod motion;
pub mod detector;
pub mod tracker;

pub use detector::{ReplayDetector, VehicleDetector, VehicleFilter};
pub use motion::{MotionParams, MotionPool, MotionReport, MotionTracker, PoolLimits};
pub use occupancy::{OccupancyClassifier, ParkingReport};
pub use tracker::{DedupPolicy, DetectorOutcome, DetectorTracker, TrackedFrame, TrackerParams};
