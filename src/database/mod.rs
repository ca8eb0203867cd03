use crate::config::DatabaseConfig;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{migrate::MigrateDatabase, Pool, Sqlite, SqlitePool};

pub mod channels;
pub mod recordings;

/// Durable store for channels and recordings.
///
/// The single source of truth for job state. Constructed once and cloned
/// into the scheduler, the capture workers and the web layer; all durable
/// state changes funnel through it.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub fn pool(&self) -> Pool<Sqlite> {
        self.pool.clone()
    }

    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        // Create database if it doesn't exist (for SQLite)
        if !Sqlite::database_exists(&config.url).await? {
            Sqlite::create_database(&config.url).await?;
        }

        let pool = SqlitePool::connect(&config.url).await?;

        Ok(Self { pool })
    }

    /// Apply the schema. Safe to call on every startup.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS channels (
                guide_number TEXT PRIMARY KEY,
                guide_name TEXT,
                url TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS recordings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id TEXT,
                date TEXT,
                start_time TEXT,
                duration INTEGER,
                status TEXT DEFAULT 'pending',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(channel_id) REFERENCES channels(guide_number)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_recordings_channel ON recordings(channel_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// Helper to parse datetime from either RFC3339 or SQLite format
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    Err(anyhow::anyhow!("Failed to parse datetime: {}", s))
}
