use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{AppSet, BackupPath, BackupSet, CreateVault, Host, OssBucket, Vault},
};

/// Hosts, app sets, paths and destinations records point at.
#[async_trait]
pub trait InventoryRepo: Send + Sync {
    async fn create_host(&self, name: &str) -> DbResult<Host>;

    async fn create_app_set(&self, name: &str) -> DbResult<AppSet>;

    async fn create_path(&self, host_id: Uuid, path: &str) -> DbResult<BackupPath>;

    async fn create_bucket(&self, endpoint: &str, bucket: &str) -> DbResult<OssBucket>;

    async fn create_vault(&self, input: CreateVault) -> DbResult<Vault>;

    async fn create_backup_set(
        &self,
        name: &str,
        bucket_id: Uuid,
        vault_id: Option<Uuid>,
    ) -> DbResult<BackupSet>;

    async fn get_vault(&self, id: Uuid) -> DbResult<Option<Vault>>;

    async fn list_vaults(&self) -> DbResult<Vec<Vault>>;
}
