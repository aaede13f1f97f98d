use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::core::db::{SiteDb, StatsRepository};
use crate::session::SharedSession;

/// Background task that stores a statistics sample each time it is ticked.
pub struct StatsRecorder {
    ticks: Option<mpsc::Sender<()>>,
    task: Option<JoinHandle<Result<()>>>,
}

impl StatsRecorder {
    pub fn spawn(db: SiteDb, session: SharedSession, session_id: Uuid) -> Self {
        let (ticks, rx) = mpsc::channel(4);
        let task = tokio::spawn(record_stats(db, session, session_id, rx));
        Self {
            ticks: Some(ticks),
            task: Some(task),
        }
    }

    /// Request a sample. If the task has already stopped, its error is returned.
    pub async fn tick(&mut self) -> Result<()> {
        if let Some(ticks) = &self.ticks {
            if ticks.send(()).await.is_ok() {
                return Ok(());
            }
        }
        self.ticks = None;
        self.join().await?;
        bail!("statistics recorder stopped")
    }

    /// Store the pending samples and stop.
    pub async fn finish(mut self) -> Result<()> {
        self.ticks = None;
        self.join().await
    }

    async fn join(&mut self) -> Result<()> {
        match self.task.take() {
            Some(task) => task.await?,
            None => Ok(()),
        }
    }
}

async fn record_stats(
    db: SiteDb,
    session: SharedSession,
    session_id: Uuid,
    mut ticks: mpsc::Receiver<()>,
) -> Result<()> {
    while ticks.recv().await.is_some() {
        let snapshot = session.snapshot();
        db.record_stats(session_id, &snapshot).await?;
        debug!(?snapshot, "statistics recorded");
    }
    Ok(())
}
