mod error;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, feature = "database-sqlite"))]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    records: Arc<dyn RecordRepo>,
    policies: Arc<dyn PolicyRepo>,
    archival_jobs: Arc<dyn ArchivalJobRepo>,
    inventory: Arc<dyn InventoryRepo>,
}

enum PoolStorage {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(not(feature = "database-sqlite"))]
    _None(std::convert::Infallible),
}

/// Database pool holding records, policies, vaults and archival jobs.
///
/// Repositories are cached at construction time to avoid allocation on each access.
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        let repos = CachedRepos {
            records: Arc::new(sqlite::SqliteRecordRepo::new(pool.clone())),
            policies: Arc::new(sqlite::SqlitePolicyRepo::new(pool.clone())),
            archival_jobs: Arc::new(sqlite::SqliteArchivalJobRepo::new(pool.clone())),
            inventory: Arc::new(sqlite::SqliteInventoryRepo::new(pool.clone())),
        };
        DbPool {
            inner: PoolStorage::Sqlite(pool),
            repos,
        }
    }

    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .foreign_keys(true)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                tracing::info!(path = %cfg.path, "Connected to SQLite database");
                Ok(Self::from_sqlite(pool))
            }
        }
    }

    /// Run database migrations using sqlx's migration runner
    /// This automatically creates and manages a _sqlx_migrations table
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Running SQLite migrations");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                tracing::info!("SQLite migrations completed successfully");
                Ok(())
            }
            #[cfg(not(feature = "database-sqlite"))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Get record repository
    pub fn records(&self) -> Arc<dyn RecordRepo> {
        Arc::clone(&self.repos.records)
    }

    /// Get policy repository
    pub fn policies(&self) -> Arc<dyn PolicyRepo> {
        Arc::clone(&self.repos.policies)
    }

    /// Get archival job repository
    pub fn archival_jobs(&self) -> Arc<dyn ArchivalJobRepo> {
        Arc::clone(&self.repos.archival_jobs)
    }

    /// Get inventory repository (hosts, app sets, paths, buckets, vaults, backup sets)
    pub fn inventory(&self) -> Arc<dyn InventoryRepo> {
        Arc::clone(&self.repos.inventory)
    }

    /// Health check for database connectivity
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(not(feature = "database-sqlite"))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}
