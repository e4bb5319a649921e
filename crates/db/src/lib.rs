// crates/db/src/lib.rs
mod migrations;
pub mod queries;

pub use queries::edits::EditRow;
pub use queries::prompts::PromptRow;
pub use queries::sessions::SessionRow;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use hookline_core::Error;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use thiserror::Error as ThisError;
use tracing::info;

#[derive(Debug, ThisError)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Maps a store-level error onto the daemon's error taxonomy.
    pub fn classify(&self) -> Error {
        match self {
            DbError::Sqlx(sqlx::Error::RowNotFound) => Error::not_found("row not found"),
            DbError::Sqlx(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Error::invalid(format!("constraint violation: {db_err}"))
            }
            DbError::Sqlx(sqlx::Error::Database(db_err)) => {
                Error::invalid(format!("constraint violation: {db_err}"))
            }
            DbError::Sqlx(sqlx::Error::PoolClosed) | DbError::Sqlx(sqlx::Error::Io(_)) => {
                Error::unavailable(self.to_string())
            }
            DbError::Sqlx(_) => Error::unavailable(self.to_string()),
            DbError::CreateDir(_) => Error::unavailable(self.to_string()),
        }
    }
}

/// Durable event store, wrapping a pooled SQLite connection opened in
/// write-ahead-log journaling mode so concurrent readers may proceed while
/// a writer is active.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl Database {
    /// Opens (or creates) the database at `path` and runs migrations.
    pub async fn new(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            db_path: path.to_owned(),
        };
        db.run_migrations().await?;
        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// In-memory database for tests. `shared_cache(true)` lets every pooled
    /// connection see the same in-memory database.
    pub async fn new_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .shared_cache(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let db = Self {
            pool,
            db_path: PathBuf::new(),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn run_migrations(&self) -> DbResult<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_migrations (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await?;
        let current_version = row.0 as usize;

        for (i, migration) in migrations::MIGRATIONS.iter().enumerate() {
            let version = i + 1;
            if version > current_version {
                sqlx::query(migration).execute(&self.pool).await?;
                sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
                    .bind(version as i64)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    /// Size in bytes derived from page count times page size, including WAL
    /// pages; does not stat the file.
    pub async fn size_bytes(&self) -> DbResult<i64> {
        let (page_count,): (i64,) = sqlx::query_as("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await?;
        let (page_size,): (i64,) = sqlx::query_as("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await?;
        Ok(page_count * page_size)
    }

    /// Reclaims free space. Blocks other writes for its duration; callers
    /// should only invoke this from the retention loop, never inline with
    /// request handling.
    pub async fn vacuum(&self) -> DbResult<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}

pub mod prelude {
    pub use crate::{Database, DbError, DbResult};
}
