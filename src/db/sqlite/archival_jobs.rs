use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{parse_code, parse_optional_uuid, parse_uuid};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::ArchivalJobRepo,
    },
    models::{ArchivalJob, JobStatus, JobType, NewArchivalJob},
};

pub struct SqliteArchivalJobRepo {
    pool: SqlitePool,
}

impl SqliteArchivalJobRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_job(row: &SqliteRow) -> DbResult<ArchivalJob> {
        let completed: bool = row.get("completed");
        Ok(ArchivalJob {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            vault_id: parse_uuid(&row.get::<String, _>("vault_id"))?,
            request_id: row.get("request_id"),
            job_id: row.get("job_id"),
            job_type: parse_code("job_type", row.get("job_type"), JobType::from_code)?,
            status: if completed {
                JobStatus::Complete
            } else {
                JobStatus::Incomplete
            },
            record_id: parse_optional_uuid(row.get("record_id"))?,
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl ArchivalJobRepo for SqliteArchivalJobRepo {
    async fn create(&self, input: NewArchivalJob) -> DbResult<ArchivalJob> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO archival_jobs (
                id, vault_id, request_id, job_id, job_type, completed, record_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(input.vault_id.to_string())
        .bind(&input.request_id)
        .bind(&input.job_id)
        .bind(input.job_type.code())
        .bind(input.record_id.map(|r| r.to_string()))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ArchivalJob {
            id,
            vault_id: input.vault_id,
            request_id: input.request_id,
            job_id: input.job_id,
            job_type: input.job_type,
            status: JobStatus::Incomplete,
            record_id: input.record_id,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<ArchivalJob>> {
        let row = sqlx::query(
            r#"
            SELECT id, vault_id, request_id, job_id, job_type, completed, record_id, created_at
            FROM archival_jobs
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_job).transpose()
    }

    async fn list_by_vault(&self, vault_id: Uuid) -> DbResult<Vec<ArchivalJob>> {
        let rows = sqlx::query(
            r#"
            SELECT id, vault_id, request_id, job_id, job_type, completed, record_id, created_at
            FROM archival_jobs
            WHERE vault_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(vault_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_job).collect()
    }

    async fn has_pending(&self, record_id: Uuid, job_type: JobType) -> DbResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM archival_jobs
                WHERE record_id = ? AND job_type = ? AND completed = 0
            ) AS pending
            "#,
        )
        .bind(record_id.to_string())
        .bind(job_type.code())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<bool, _>("pending"))
    }

    async fn mark_complete(&self, id: Uuid) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE archival_jobs SET completed = 1 WHERE id = ? AND completed = 0")
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        match self.get_by_id(id).await? {
            Some(_) => Ok(false),
            None => Err(DbError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM archival_jobs WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}
