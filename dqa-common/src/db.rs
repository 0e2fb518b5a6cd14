//! Shared database pool initialization

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize the SQLite connection pool
///
/// **[DQA-DB-010]** Opens (or creates) the database file with mode=rwc,
/// creating the parent directory when missing. Table creation is owned by
/// the service crate.
pub async fn init_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    Ok(pool)
}

/// In-memory pool for tests and ephemeral runs
///
/// Capped at one connection: each new connection to `:memory:` would open
/// its own empty database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}
