mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from parkwatch for tests
pub use parkwatch::core::db::{EventLog, RegionRepository, SiteDb, StatsRepository};
pub use parkwatch::models::{Centroid, CountingLine, Detection, Region, StatsSnapshot};
