use anyhow::{bail, Context, Result};
use image::RgbImage;
use std::collections::VecDeque;
use std::path::Path;

use crate::models::Detection;

/// COCO class names for the label ids a vehicle detector can emit.
pub const COCO_CLASSES: [&str; 10] = [
    "background",
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
];

/// Label ids treated as vehicles.
pub const VEHICLE_CLASSES: [u32; 6] = [2, 3, 5, 6, 7, 8];

pub fn class_name(label: u32) -> &'static str {
    COCO_CLASSES.get(label as usize).copied().unwrap_or("object")
}

/// Injected object-detection capability.
///
/// Implementations own model loading and inference; callers only see
/// vehicle boxes for one frame at a time.
pub trait VehicleDetector: Send {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>>;
}

/// Confidence and class gate applied to raw detector output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleFilter {
    /// Scores must be strictly above this
    pub confidence_threshold: f32,
}

impl VehicleFilter {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.score > self.confidence_threshold && VEHICLE_CLASSES.contains(&detection.label)
    }

    pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections.into_iter().filter(|d| self.accepts(d)).collect()
    }
}

impl Default for VehicleFilter {
    fn default() -> Self {
        Self::new(0.6)
    }
}

/// Plays back detections recorded by an external detector, one frame per call.
///
/// The file is a JSON array with one entry per frame; each entry is an array
/// of `[x1, y1, x2, y2, score, label]` tuples.
#[derive(Debug, Clone)]
pub struct ReplayDetector {
    frames: VecDeque<Vec<Detection>>,
    filter: VehicleFilter,
}

impl ReplayDetector {
    pub fn from_json(json: &str, filter: VehicleFilter) -> Result<Self> {
        let frames: Vec<Vec<Detection>> =
            serde_json::from_str(json).context("Failed to parse detection replay")?;
        Ok(Self {
            frames: frames.into(),
            filter,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P, filter: VehicleFilter) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read detection replay {:?}", path))?;
        Self::from_json(&json, filter)
    }

    /// Frames left to play back
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl VehicleDetector for ReplayDetector {
    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<Detection>> {
        match self.frames.pop_front() {
            Some(detections) => Ok(self.filter.apply(detections)),
            None => bail!("detection replay exhausted"),
        }
    }
}
