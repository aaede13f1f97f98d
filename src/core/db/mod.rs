mod events;
mod region;
mod state;
mod stats;
mod util;

use std::path::{Path, PathBuf};

use anyhow::Context;
use sqlx::sqlite::SqlitePool;
use tokio::fs as async_fs;
use tracing::info;
use uuid::Uuid;

use crate::models::{Region, StatsSnapshot};
use region::{ReferenceRow, RegionRow};
use stats::StatsRow;

pub use events::{EventLog, EventRecord};
pub use region::{ReferenceImage, RegionRepository};
pub use stats::{CSV_HEADER, StatsRecord, StatsRepository};
pub use util::{display_timestamp, file_timestamp};

/// Persistent store for one monitored site: region layouts, video
/// associations, statistics samples and the event log.
#[derive(Debug, Clone)]
pub struct SiteDb {
    pool: SqlitePool,
}

impl SiteDb {
    pub async fn open<P: AsRef<Path>>(db_file: P) -> anyhow::Result<Self> {
        let pool = state::open_pool(db_file.as_ref()).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl RegionRepository for SiteDb {
    async fn load_regions(&self, reference: &str) -> anyhow::Result<Vec<Region>> {
        let rows: Vec<RegionRow> = sqlx::query_as(
            r#"SELECT x, y, width, height FROM region WHERE reference = $1 ORDER BY position ASC"#,
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Region::from).collect())
    }

    async fn save_regions(&self, reference: &str, regions: &[Region]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(r#"DELETE FROM region WHERE reference = $1"#)
            .bind(reference)
            .execute(&mut *tx)
            .await?;
        for (position, r) in regions.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO region (reference, position, x, y, width, height)
                VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(reference)
            .bind(position as i64)
            .bind(r.x)
            .bind(r.y)
            .bind(r.width)
            .bind(r.height)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        info!("Saved {} parking spaces for {}", regions.len(), reference);
        Ok(())
    }

    async fn clear_regions(&self, reference: &str) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM region WHERE reference = $1"#)
            .bind(reference)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_reference_dimensions(&self, reference: &str, width: u32, height: u32) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO reference_image (name, width, height) VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET width = EXCLUDED.width, height = EXCLUDED.height"#,
        )
        .bind(reference)
        .bind(i64::from(width))
        .bind(i64::from(height))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reference_dimensions(&self, reference: &str) -> anyhow::Result<Option<(u32, u32)>> {
        let row: Option<(i64, i64)> =
            sqlx::query_as(r#"SELECT width, height FROM reference_image WHERE name = $1"#)
                .bind(reference)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(w, h)| (w as u32, h as u32)))
    }

    async fn list_references(&self) -> anyhow::Result<Vec<ReferenceImage>> {
        let rows: Vec<ReferenceRow> = sqlx::query_as(
            r#"SELECT ri.name AS name, ri.width AS width, ri.height AS height,
                (SELECT COUNT(*) FROM region r WHERE r.reference = ri.name) AS region_count
            FROM reference_image ri ORDER BY ri.name ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ReferenceImage::from).collect())
    }

    async fn associate_video(&self, source: &str, reference: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO video_reference (source, reference) VALUES ($1, $2)
            ON CONFLICT (source) DO UPDATE SET reference = EXCLUDED.reference"#,
        )
        .bind(source)
        .bind(reference)
        .execute(&self.pool)
        .await?;
        self.log_event(&format!("Associated video {} with {}", source, reference))
            .await
    }

    async fn reference_for_video(&self, source: &str) -> anyhow::Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as(r#"SELECT reference FROM video_reference WHERE source = $1"#)
                .bind(source)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(reference,)| reference))
    }
}

impl StatsRepository for SiteDb {
    async fn record_stats(&self, session_id: Uuid, snapshot: &StatsSnapshot) -> anyhow::Result<()> {
        let recorded_at = display_timestamp(util::now())?;
        sqlx::query(
            r#"INSERT INTO stats_snapshot
                (session_id, recorded_at, total_spaces, free_spaces, occupied_spaces, vehicles)
            VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(session_id.to_string())
        .bind(recorded_at)
        .bind(snapshot.total_spaces as i64)
        .bind(snapshot.free_spaces as i64)
        .bind(snapshot.occupied_spaces as i64)
        .bind(snapshot.vehicles as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_stats(&self) -> anyhow::Result<Vec<StatsRecord>> {
        let rows: Vec<StatsRow> = sqlx::query_as(
            r#"SELECT session_id, recorded_at, total_spaces, free_spaces, occupied_spaces, vehicles
            FROM stats_snapshot ORDER BY id ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(StatsRecord::from).collect())
    }

    async fn clear_stats(&self) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM stats_snapshot"#)
            .execute(&self.pool)
            .await?;
        self.log_event("Statistics cleared").await
    }

    async fn export_stats_csv(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let records = self.list_stats().await?;
        if records.is_empty() {
            anyhow::bail!("No statistics data to export");
        }

        let mut contents = String::from(CSV_HEADER);
        contents.push('\n');
        for record in &records {
            contents.push_str(&record.csv_line());
            contents.push('\n');
        }

        let path = dir.join(format!("parking_stats_{}.csv", file_timestamp(util::now())?));
        async_fs::create_dir_all(dir).await?;
        async_fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write statistics export {:?}", path))?;
        self.log_event(&format!("Statistics exported to {}", path.display()))
            .await?;
        Ok(path)
    }
}

impl EventLog for SiteDb {
    async fn log_event(&self, message: &str) -> anyhow::Result<()> {
        let recorded_at = display_timestamp(util::now())?;
        sqlx::query(r#"INSERT INTO event_log (recorded_at, message) VALUES ($1, $2)"#)
            .bind(&recorded_at)
            .bind(message)
            .execute(&self.pool)
            .await?;
        info!("{}", message);
        Ok(())
    }

    async fn list_events(&self) -> anyhow::Result<Vec<EventRecord>> {
        let events = sqlx::query_as::<_, EventRecord>(
            r#"SELECT recorded_at, message FROM event_log ORDER BY id ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn clear_events(&self) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM event_log"#)
            .execute(&self.pool)
            .await?;
        self.log_event("Log cleared").await
    }

    async fn save_log(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let events = self.list_events().await?;
        if events.is_empty() {
            anyhow::bail!("No log data to save");
        }

        let mut contents = String::new();
        for event in &events {
            contents.push_str(&event.to_string());
            contents.push('\n');
        }

        let path = dir.join(format!("parking_log_{}.txt", file_timestamp(util::now())?));
        async_fs::create_dir_all(dir).await?;
        async_fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write log file {:?}", path))?;
        Ok(path)
    }
}
