use anyhow::Context;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;

/// Open (creating if needed) the site database and bring its schema up to date.
pub(super) async fn open_pool(db_file: &Path) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = db_file.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            anyhow::bail!("Database parent does not exist: {:?}", db_file);
        }
    }

    let connect_opts = SqliteConnectOptions::new()
        .filename(db_file)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_opts)
        .await
        .with_context(|| format!("Failed to open site database {:?}", db_file))?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
