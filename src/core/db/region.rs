use std::future::Future;

use crate::models::Region;

/// A reference image that parking regions are drawn on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub region_count: usize,
}

#[derive(sqlx::FromRow)]
pub(super) struct RegionRow {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl From<RegionRow> for Region {
    fn from(row: RegionRow) -> Self {
        Region::new(row.x as i32, row.y as i32, row.width as i32, row.height as i32)
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct ReferenceRow {
    pub name: String,
    pub width: i64,
    pub height: i64,
    pub region_count: i64,
}

impl From<ReferenceRow> for ReferenceImage {
    fn from(row: ReferenceRow) -> Self {
        ReferenceImage {
            name: row.name,
            width: row.width as u32,
            height: row.height as u32,
            region_count: row.region_count as usize,
        }
    }
}

/// Region layouts keyed by reference image, plus the video to reference mapping.
pub trait RegionRepository {
    /// Regions for `reference` in display order; empty when none were saved
    fn load_regions(&self, reference: &str) -> impl Future<Output = anyhow::Result<Vec<Region>>> + Send;
    /// Replace the stored layout for `reference`
    fn save_regions(&self, reference: &str, regions: &[Region]) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn clear_regions(&self, reference: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn set_reference_dimensions(&self, reference: &str, width: u32, height: u32) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn reference_dimensions(&self, reference: &str) -> impl Future<Output = anyhow::Result<Option<(u32, u32)>>> + Send;
    fn list_references(&self) -> impl Future<Output = anyhow::Result<Vec<ReferenceImage>>> + Send;
    /// Remember which reference image a video source uses
    fn associate_video(&self, source: &str, reference: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn reference_for_video(&self, source: &str) -> impl Future<Output = anyhow::Result<Option<String>>> + Send;
}
