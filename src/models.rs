use serde::{Deserialize, Serialize};

/// A monitored parking space in reference-image pixel coordinates.
///
/// Regions carry no identity of their own; their position in the owning
/// list is the display ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether the region can be scored against a frame of the given size.
    /// The far edges must lie strictly inside the frame.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && (self.x as i64 + self.width as i64) < frame_width as i64
            && (self.y as i64 + self.height as i64) < frame_height as i64
    }

    /// Closed-rectangle hit test, used when picking a region to delete.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.x <= x && x <= self.x + self.width && self.y <= y && y <= self.y + self.height
    }
}

/// Integer centre point standing in for a moving object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Centroid {
    pub x: i32,
    pub y: i32,
}

impl Centroid {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Centre of an `(x, y, w, h)` rectangle, floor division.
    pub fn of_rect(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x: x + width.div_euclid(2),
            y: y + height.div_euclid(2),
        }
    }

    /// Midpoint of a corner-form box, floor division.
    pub fn of_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: (x1 + x2).div_euclid(2),
            y: (y1 + y2).div_euclid(2),
        }
    }

    pub fn distance(&self, other: &Centroid) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Bounding box of one border found in a binary mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contour {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Contour {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn centroid(&self) -> Centroid {
        Centroid::of_rect(
            self.min_x as i32,
            self.min_y as i32,
            self.width() as i32,
            self.height() as i32,
        )
    }
}

/// One detector hit, already filtered to vehicle classes.
///
/// Deserializes from either a map or the compact
/// `[x1, y1, x2, y2, score, label]` array form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub score: f32,
    pub label: u32,
}

impl Detection {
    pub fn centroid(&self) -> Centroid {
        Centroid::of_corners(self.x1, self.y1, self.x2, self.y2)
    }
}

/// Horizontal counting line with its symmetric tolerance band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountingLine {
    pub y: i32,
    pub offset: i32,
}

impl CountingLine {
    /// Pull a configured line back inside the frame: anything at or below the
    /// bottom edge is moved to 50px above it.
    pub fn resolve(line_height: i32, offset: i32, frame_height: u32) -> Self {
        let frame_height = frame_height as i32;
        let y = if line_height >= frame_height {
            (frame_height - 50).max(0)
        } else {
            line_height
        };
        Self { y, offset }
    }

    /// Open interval `(y - offset, y + offset)`.
    pub fn in_band(&self, y: i32) -> bool {
        self.y - self.offset < y && y < self.y + self.offset
    }
}

/// Per-region score for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyResult {
    pub index: usize,
    pub region: Region,
    pub active_pixels: u32,
    pub occupied: bool,
}

/// Point-in-time counters for the presentation layer and the stats log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_spaces: usize,
    pub free_spaces: usize,
    pub occupied_spaces: usize,
    pub vehicles: u64,
}
