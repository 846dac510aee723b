//! Test utilities for database operations.
//!
//! Provides a migrated in-memory `SQLite` database and row fixtures.

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use tracing::info;

use crate::entities::emoticon;
use crate::migrations::Migrator;

/// A migrated in-memory test database.
///
/// Every instance is a separate database, so tests may run in parallel.
pub struct TestDatabase {
    conn: DatabaseConnection,
}

impl TestDatabase {
    /// Create a fresh database with all migrations applied.
    pub async fn new() -> Result<Self, DbErr> {
        // Each pooled connection to `:memory:` opens its own database
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        info!("Created in-memory test database");

        Ok(Self { conn })
    }

    /// Consume the helper, returning the connection.
    #[must_use]
    pub fn into_connection(self) -> DatabaseConnection {
        self.conn
    }
}

/// A complete row for `emoticon_id` named `name`, not yet archived.
#[must_use]
pub fn emoticon_fixture(emoticon_id: i64, name: &str) -> emoticon::Model {
    emoticon::Model {
        emoticon_id,
        name: name.to_string(),
        description: format!("{name} pack"),
        icon: format!(
            "https://cdn.test/img/parcel/{}/{emoticon_id}/200x200.png",
            emoticon_id % 10
        ),
        archive_url: String::new(),
        archive_size: 0,
        animated: false,
        images: json!([{
            "keyword": "hello",
            "src": "https://cdn.test/a.png",
            "preview": "https://cdn.test/a.png",
        }]),
        metadata: json!({ "appData": { "name": name } }),
    }
}
