//! Test harness for database repository testing
//!
//! Provides utilities for setting up test databases:
//! - SQLite: Fast in-memory databases with real migrations
//! - Redis: Testcontainers-based instances for the cache backend
//! - Seeded inventory (host, app set, path, bucket, vault, backup set)

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::DbPool,
    models::{CreateRecord, CreateVault, Record, RecordType},
};

/// Create an in-memory SQLite pool for testing
pub async fn create_sqlite_pool() -> SqlitePool {
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// Run SQLite migrations on the pool
///
/// Uses the actual migration files to ensure tests match production schema
pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations_sqlx/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}

/// Migrated in-memory database wrapped in a [`DbPool`]
pub async fn create_test_db() -> DbPool {
    let pool = create_sqlite_pool().await;
    run_sqlite_migrations(&pool).await;
    DbPool::from_sqlite(pool)
}

/// Ids of one seeded host/app set/path behind a backup set with a vault
#[derive(Debug, Clone)]
pub struct Inventory {
    pub host_id: Uuid,
    pub app_set_id: Uuid,
    pub path_id: Uuid,
    pub backup_set_id: Uuid,
    pub vault_id: Uuid,
}

pub const TEST_HOST: &str = "db01";
pub const TEST_APP_SET: &str = "postgres";
pub const TEST_PATH: &str = "/var/backups";
pub const TEST_OSS_ENDPOINT: &str = "oss-cn-hangzhou.example.com";
pub const TEST_BUCKET: &str = "nightly";
pub const TEST_VAULT_ID: &str = "vault-7f3a";
pub const TEST_VAULT_ENDPOINT: &str = "cn-hangzhou.oas.example.com";

pub async fn seed_inventory(db: &DbPool) -> Inventory {
    let inventory = db.inventory();
    let host = inventory.create_host(TEST_HOST).await.expect("host");
    let app_set = inventory.create_app_set(TEST_APP_SET).await.expect("app set");
    let path = inventory.create_path(host.id, TEST_PATH).await.expect("path");
    let bucket = inventory
        .create_bucket(TEST_OSS_ENDPOINT, TEST_BUCKET)
        .await
        .expect("bucket");
    let vault = inventory
        .create_vault(CreateVault {
            name: "primary".into(),
            vault_id: TEST_VAULT_ID.into(),
            endpoint: TEST_VAULT_ENDPOINT.into(),
        })
        .await
        .expect("vault");
    let backup_set = inventory
        .create_backup_set("nightly", bucket.id, Some(vault.id))
        .await
        .expect("backup set");

    Inventory {
        host_id: host.id,
        app_set_id: app_set.id,
        path_id: path.id,
        backup_set_id: backup_set.id,
        vault_id: vault.id,
    }
}

impl Inventory {
    pub fn record_input(&self, filename: &str, backup_time: DateTime<Utc>) -> CreateRecord {
        CreateRecord {
            host_id: self.host_id,
            app_set_id: self.app_set_id,
            backup_set_id: self.backup_set_id,
            path_id: self.path_id,
            filename: filename.to_string(),
            record_type: RecordType::Backup,
            backup_time,
            archived_time: None,
            archive_id: None,
        }
    }

    pub async fn create_backup(
        &self,
        db: &DbPool,
        filename: &str,
        backup_time: DateTime<Utc>,
    ) -> Record {
        db.records()
            .create(self.record_input(filename, backup_time))
            .await
            .expect("Failed to create backup record")
    }

    pub async fn create_archive(
        &self,
        db: &DbPool,
        filename: &str,
        archived_time: DateTime<Utc>,
        archive_id: &str,
    ) -> Record {
        let input = CreateRecord {
            record_type: RecordType::Archive,
            archived_time: Some(archived_time),
            archive_id: Some(archive_id.to_string()),
            ..self.record_input(filename, archived_time)
        };
        db.records()
            .create(input)
            .await
            .expect("Failed to create archive record")
    }
}

/// Redis test harness using testcontainers
#[cfg(feature = "redis")]
pub mod redis {
    use testcontainers_modules::{
        redis::Redis,
        testcontainers::{ContainerAsync, runners::AsyncRunner},
    };

    /// Start a Redis container and return the connection URL and container handle
    /// The container is kept alive as long as the returned handle is held
    pub async fn create_redis_container() -> (String, ContainerAsync<Redis>) {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get port");

        let url = format!("redis://{}:{}", host, port);

        (url, container)
    }
}
