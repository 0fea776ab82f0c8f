use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CreatePolicy, Policy},
};

#[async_trait]
pub trait PolicyRepo: Send + Sync {
    async fn create(&self, input: CreatePolicy) -> DbResult<Policy>;

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Policy>>;

    /// All policies with their filter sets, oldest first.
    async fn list(&self) -> DbResult<Vec<Policy>>;

    async fn delete(&self, id: Uuid) -> DbResult<()>;
}
