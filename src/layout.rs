use tracing::info;

use crate::models::Region;

/// Smallest width and height (exclusive) a dragged region may have
pub const MIN_REGION_SIZE: i32 = 20;

/// Ordered set of parking regions for one reference image.
/// A region's index in the layout is its display ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionLayout {
    regions: Vec<Region>,
}

impl RegionLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_regions(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn into_regions(self) -> Vec<Region> {
        self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Add the rectangle spanned by two drag corners, in any order.
    /// Returns `None` when it is not larger than 20px in both directions.
    pub fn add_from_drag(&mut self, start: (i32, i32), end: (i32, i32)) -> Option<Region> {
        let (x1, y1) = (start.0.min(end.0), start.1.min(end.1));
        let (x2, y2) = (start.0.max(end.0), start.1.max(end.1));
        let region = Region::new(x1, y1, x2 - x1, y2 - y1);
        if region.width <= MIN_REGION_SIZE || region.height <= MIN_REGION_SIZE {
            return None;
        }
        self.regions.push(region);
        info!("Added parking space at ({}, {})", x1, y1);
        Some(region)
    }

    /// Remove the first region containing the point. Later regions shift down.
    pub fn remove_at(&mut self, x: i32, y: i32) -> Option<Region> {
        let index = self.regions.iter().position(|r| r.contains(x, y))?;
        let removed = self.regions.remove(index);
        info!("Removed parking space at ({}, {})", removed.x, removed.y);
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }
}

impl<'a> IntoIterator for &'a RegionLayout {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}
