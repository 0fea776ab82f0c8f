use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{ArchivalJob, JobType, NewArchivalJob},
};

#[async_trait]
pub trait ArchivalJobRepo: Send + Sync {
    async fn create(&self, input: NewArchivalJob) -> DbResult<ArchivalJob>;

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<ArchivalJob>>;

    /// Every job (complete or not) belonging to a local vault, oldest first.
    async fn list_by_vault(&self, vault_id: Uuid) -> DbResult<Vec<ArchivalJob>>;

    /// Whether the record has an incomplete job of the given type.
    async fn has_pending(&self, record_id: Uuid, job_type: JobType) -> DbResult<bool>;

    /// Transition a job to complete.
    ///
    /// Returns `false` when the job was already complete, so completion
    /// effects are applied at most once.
    async fn mark_complete(&self, id: Uuid) -> DbResult<bool>;

    async fn delete(&self, id: Uuid) -> DbResult<()>;
}
