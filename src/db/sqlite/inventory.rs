use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::InventoryRepo,
    },
    models::{AppSet, BackupPath, BackupSet, CreateVault, Host, OssBucket, Vault},
};

pub struct SqliteInventoryRepo {
    pool: SqlitePool,
}

impl SqliteInventoryRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_vault(row: &SqliteRow) -> DbResult<Vault> {
        Ok(Vault {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            name: row.get("name"),
            vault_id: row.get("vault_id"),
            endpoint: row.get("endpoint"),
            created_at: row.get("created_at"),
        })
    }
}

fn conflict_on_unique(what: String) -> impl FnOnce(sqlx::Error) -> DbError {
    move |e| match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DbError::Conflict(format!("{} already exists", what))
        }
        _ => DbError::from(e),
    }
}

#[async_trait]
impl InventoryRepo for SqliteInventoryRepo {
    async fn create_host(&self, name: &str) -> DbResult<Host> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query("INSERT INTO hosts (id, name, created_at) VALUES (?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(conflict_on_unique(format!("Host '{}'", name)))?;

        Ok(Host {
            id,
            name: name.to_string(),
            created_at: now,
        })
    }

    async fn create_app_set(&self, name: &str) -> DbResult<AppSet> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query("INSERT INTO app_sets (id, name, created_at) VALUES (?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(conflict_on_unique(format!("App set '{}'", name)))?;

        Ok(AppSet {
            id,
            name: name.to_string(),
            created_at: now,
        })
    }

    async fn create_path(&self, host_id: Uuid, path: &str) -> DbResult<BackupPath> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query("INSERT INTO paths (id, host_id, path, created_at) VALUES (?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(host_id.to_string())
            .bind(path)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(conflict_on_unique(format!("Path '{}'", path)))?;

        Ok(BackupPath {
            id,
            host_id,
            path: path.to_string(),
            created_at: now,
        })
    }

    async fn create_bucket(&self, endpoint: &str, bucket: &str) -> DbResult<OssBucket> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO oss_buckets (id, endpoint, bucket, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(endpoint)
        .bind(bucket)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(conflict_on_unique(format!("Bucket '{}' at {}", bucket, endpoint)))?;

        Ok(OssBucket {
            id,
            endpoint: endpoint.to_string(),
            bucket: bucket.to_string(),
            created_at: now,
        })
    }

    async fn create_vault(&self, input: CreateVault) -> DbResult<Vault> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO vaults (id, name, vault_id, endpoint, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&input.name)
        .bind(&input.vault_id)
        .bind(&input.endpoint)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(conflict_on_unique(format!("Vault '{}'", input.name)))?;

        Ok(Vault {
            id,
            name: input.name,
            vault_id: input.vault_id,
            endpoint: input.endpoint,
            created_at: now,
        })
    }

    async fn create_backup_set(
        &self,
        name: &str,
        bucket_id: Uuid,
        vault_id: Option<Uuid>,
    ) -> DbResult<BackupSet> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO backup_sets (id, name, bucket_id, vault_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(name)
        .bind(bucket_id.to_string())
        .bind(vault_id.map(|v| v.to_string()))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(conflict_on_unique(format!("Backup set '{}'", name)))?;

        Ok(BackupSet {
            id,
            name: name.to_string(),
            bucket_id,
            vault_id,
            created_at: now,
        })
    }

    async fn get_vault(&self, id: Uuid) -> DbResult<Option<Vault>> {
        let row = sqlx::query(
            "SELECT id, name, vault_id, endpoint, created_at FROM vaults WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_vault).transpose()
    }

    async fn list_vaults(&self) -> DbResult<Vec<Vault>> {
        let rows = sqlx::query(
            "SELECT id, name, vault_id, endpoint, created_at FROM vaults ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_vault).collect()
    }
}
