use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::Storage;

mod attempt_repo;
mod mapping;
mod migrate;
mod question_repo;
mod reward_repo;
mod session_state_repo;

/// `SQLite` backend implementing every repository trait on one pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: i64, supported: i64 },
}

impl SqliteRepository {
    /// Connect to `SQLite` with foreign keys, WAL and a busy timeout.
    ///
    /// The database file is created when missing.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid or the connection
    /// cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::SchemaTooNew` for a database written by a
    /// newer build, or the underlying error if a migration fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await?;
        let found = self.schema_version().await?;
        let supported = migrate::latest_version();
        if found > supported {
            return Err(SqliteInitError::SchemaTooNew { found, supported });
        }
        Ok(())
    }

    /// Highest applied migration, or 0 on a fresh database.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the migration table cannot be read.
    pub async fn schema_version(&self) -> Result<i64, SqliteInitError> {
        let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await?;
        Ok(version.unwrap_or(0))
    }
}

impl Storage {
    /// Open, migrate and wrap a `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        Ok(Self::from_repo(repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[tokio::test]
    async fn fresh_database_reaches_latest_schema() {
        let repo = SqliteRepository::connect("sqlite:file:memdb_schema?mode=memory&cache=shared")
            .await
            .unwrap();
        repo.migrate().await.unwrap();
        assert_eq!(repo.schema_version().await.unwrap(), migrate::latest_version());
    }

    #[tokio::test]
    async fn newer_schema_is_refused() {
        let repo = SqliteRepository::connect("sqlite:file:memdb_schema_new?mode=memory&cache=shared")
            .await
            .unwrap();
        repo.migrate().await.unwrap();
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (99, 'x')")
            .execute(repo.pool())
            .await
            .unwrap();

        let err = repo.migrate().await.unwrap_err();
        assert!(matches!(err, SqliteInitError::SchemaTooNew { found: 99, .. }));
    }
}
