use std::{fmt, future::Future, path::{Path, PathBuf}};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct EventRecord {
    pub recorded_at: String,
    pub message: String,
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.recorded_at, self.message)
    }
}

/// Timestamped operator-facing event log
pub trait EventLog {
    fn log_event(&self, message: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn list_events(&self) -> impl Future<Output = anyhow::Result<Vec<EventRecord>>> + Send;
    fn clear_events(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
    /// Write the log to `parking_log_<timestamp>.txt` under `dir`. Fails when the log is empty.
    fn save_log(&self, dir: &Path) -> impl Future<Output = anyhow::Result<PathBuf>> + Send;
}
