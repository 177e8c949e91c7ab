pub mod audit;
pub mod models;

use chrono::{SecondsFormat, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub use audit::AuditLog;

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            pool: open_pool(url).await?,
        })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Opens a SQLite pool, creating the parent directory of file databases.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that is never recycled.
pub(crate) async fn open_pool(url: &str) -> anyhow::Result<SqlitePool> {
    if url.contains(":memory:") {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;
        return Ok(pool);
    }

    if let Some(path) = url.strip_prefix("sqlite:") {
        let path = path.trim_start_matches("//");
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await?;

    Ok(pool)
}

/// Current time as a fixed-width RFC 3339 string, so stored timestamps sort
/// lexicographically.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
