use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CreateRecord, Record, RecordDetail, RecordQuery},
};

#[async_trait]
pub trait RecordRepo: Send + Sync {
    /// Register a completed backup.
    async fn create(&self, input: CreateRecord) -> DbResult<Record>;

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Record>>;

    /// Get a record joined with its host, app set, path and backup set destinations.
    async fn get_detail(&self, id: Uuid) -> DbResult<Option<RecordDetail>>;

    /// Records matching a policy filter combination, ascending by the
    /// timestamp relevant to the queried record type.
    async fn list_for_policy(&self, query: &RecordQuery) -> DbResult<Vec<RecordDetail>>;

    /// Flip a record to archive-only, keeping its archive id.
    async fn convert_to_archive(&self, id: Uuid) -> DbResult<()>;

    /// Mark a record as restored into object storage at `at`.
    async fn restore_as_backup(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()>;

    /// Attach the cold archive copy produced by a completed archive job.
    async fn set_archive_copy(&self, id: Uuid, archive_id: &str, at: DateTime<Utc>)
    -> DbResult<()>;

    /// Hard-delete a record. Returns `NotFound` if it does not exist.
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}
