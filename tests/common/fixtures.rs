#![allow(dead_code)]

use anyhow::bail;
use image::{Rgb, RgbImage};
use parkwatch::core::db::SiteDb;
use parkwatch::detection::VehicleDetector;
use parkwatch::models::Detection;

/// Uniform black frame.
pub fn black_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::new(width, height)
}

/// Black frame with a filled white square whose top-left corner is `(x, y)`.
pub fn frame_with_square(width: u32, height: u32, x: u32, y: u32, side: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |px, py| {
        if px >= x && px < x + side && py >= y && py < y + side {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Black frame with a black and white checkerboard (6px cells) painted over
/// the given rectangle, standing in for a parked car's texture.
pub fn frame_with_texture(width: u32, height: u32, x: u32, y: u32, w: u32, h: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |px, py| {
        let inside = px >= x && px < x + w && py >= y && py < y + h;
        if inside && ((px / 6) + (py / 6)) % 2 == 0 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Creates a SiteDb in a temporary directory.
/// Returns both the database and the temp directory (which must be kept alive).
pub async fn create_test_db() -> (SiteDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let db = SiteDb::open(dir.path().join("site.db"))
        .await
        .expect("Failed to open test database");
    (db, dir)
}

/// Vehicle detection with the given corners, a car at 0.9 confidence.
pub fn car(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
    Detection {
        x1,
        y1,
        x2,
        y2,
        score: 0.9,
        label: 3,
    }
}

/// Detector returning a scripted list of results, one per call.
pub struct ScriptedDetector {
    pub results: Vec<anyhow::Result<Vec<Detection>>>,
}

impl ScriptedDetector {
    pub fn new(results: Vec<anyhow::Result<Vec<Detection>>>) -> Self {
        Self { results }
    }
}

impl VehicleDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &RgbImage) -> anyhow::Result<Vec<Detection>> {
        if self.results.is_empty() {
            bail!("no scripted result left");
        }
        self.results.remove(0)
    }
}

/// Detector that always fails.
pub struct FailingDetector;

impl VehicleDetector for FailingDetector {
    fn detect(&mut self, _frame: &RgbImage) -> anyhow::Result<Vec<Detection>> {
        bail!("model not loaded")
    }
}

/// Black frame with a filled square of the given colour.
pub fn frame_with_colored_square(width: u32, height: u32, x: u32, y: u32, side: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(width, height, |px, py| {
        if px >= x && px < x + side && py >= y && py < y + side {
            color
        } else {
            Rgb([0, 0, 0])
        }
    })
}
