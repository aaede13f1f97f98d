use std::{future::Future, path::{Path, PathBuf}};

use uuid::Uuid;

use crate::models::StatsSnapshot;

pub const CSV_HEADER: &str = "Timestamp,Total Spaces,Free Spaces,Occupied Spaces,Vehicles Counted";

/// One persisted statistics sample
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRecord {
    pub session_id: String,
    pub recorded_at: String,
    pub snapshot: StatsSnapshot,
}

impl StatsRecord {
    pub fn csv_line(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.recorded_at,
            self.snapshot.total_spaces,
            self.snapshot.free_spaces,
            self.snapshot.occupied_spaces,
            self.snapshot.vehicles
        )
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct StatsRow {
    pub session_id: String,
    pub recorded_at: String,
    pub total_spaces: i64,
    pub free_spaces: i64,
    pub occupied_spaces: i64,
    pub vehicles: i64,
}

impl From<StatsRow> for StatsRecord {
    fn from(row: StatsRow) -> Self {
        StatsRecord {
            session_id: row.session_id,
            recorded_at: row.recorded_at,
            snapshot: StatsSnapshot {
                total_spaces: row.total_spaces as usize,
                free_spaces: row.free_spaces as usize,
                occupied_spaces: row.occupied_spaces as usize,
                vehicles: row.vehicles as u64,
            },
        }
    }
}

pub trait StatsRepository {
    fn record_stats(&self, session_id: Uuid, snapshot: &StatsSnapshot) -> impl Future<Output = anyhow::Result<()>> + Send;
    /// All samples, oldest first
    fn list_stats(&self) -> impl Future<Output = anyhow::Result<Vec<StatsRecord>>> + Send;
    fn clear_stats(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
    /// Write every sample to `parking_stats_<timestamp>.csv` under `dir`.
    /// Fails when there is nothing to export.
    fn export_stats_csv(&self, dir: &Path) -> impl Future<Output = anyhow::Result<PathBuf>> + Send;
}
