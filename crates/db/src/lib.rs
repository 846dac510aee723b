//! Database layer for qsticker.
//!
//! A single `SQLite` table holds one row per archived emoticon pack. The
//! database runs in WAL mode and is checkpointed on shutdown.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use std::path::Path;
use std::time::Duration;

use qsticker_common::{AppError, Config};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tracing::log::LevelFilter;

/// Initialize database connection.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    ensure_parent_dir(&config.database.url).await?;

    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    let db = Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    db.execute_unprepared("PRAGMA journal_mode=WAL")
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(db)
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Flush the write-ahead log into the main file and compact it.
pub async fn checkpoint(db: &DatabaseConnection) -> Result<(), AppError> {
    for statement in ["PRAGMA wal_checkpoint(TRUNCATE)", "VACUUM"] {
        db.execute_unprepared(statement)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
    }
    Ok(())
}

/// File path of an `sqlite://` URL, if it names a file.
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(Path::new(path))
}

async fn ensure_parent_dir(url: &str) -> Result<(), AppError> {
    let Some(parent) = sqlite_file_path(url).and_then(Path::parent) else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| AppError::Database(format!("cannot create {}: {e}", parent.display())))
}
