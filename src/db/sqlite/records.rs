use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{parse_code, parse_optional_uuid, parse_uuid};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::RecordRepo,
    },
    models::{
        CreateRecord, Record, RecordDetail, RecordLocation, RecordQuery, RecordType, VaultRef,
    },
};

const DETAIL_SELECT: &str = r#"
    SELECT r.id, r.host_id, r.app_set_id, r.backup_set_id, r.path_id, r.filename,
           r.record_type, r.backup_time, r.archived_time, r.archive_id, r.created_at,
           h.name AS host_name, a.name AS app_set_name, p.path AS path,
           b.endpoint AS oss_endpoint, b.bucket AS bucket,
           v.id AS vault_local_id, v.vault_id AS vault_external_id, v.endpoint AS vault_endpoint
    FROM records r
    INNER JOIN hosts h ON h.id = r.host_id
    INNER JOIN app_sets a ON a.id = r.app_set_id
    INNER JOIN paths p ON p.id = r.path_id
    INNER JOIN backup_sets s ON s.id = r.backup_set_id
    INNER JOIN oss_buckets b ON b.id = s.bucket_id
    LEFT JOIN vaults v ON v.id = s.vault_id
"#;

pub struct SqliteRecordRepo {
    pool: SqlitePool,
}

impl SqliteRecordRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_record(row: &SqliteRow) -> DbResult<Record> {
        Ok(Record {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            host_id: parse_uuid(&row.get::<String, _>("host_id"))?,
            app_set_id: parse_uuid(&row.get::<String, _>("app_set_id"))?,
            backup_set_id: parse_uuid(&row.get::<String, _>("backup_set_id"))?,
            path_id: parse_uuid(&row.get::<String, _>("path_id"))?,
            filename: row.get("filename"),
            record_type: parse_code("record_type", row.get("record_type"), RecordType::from_code)?,
            backup_time: row.get("backup_time"),
            archived_time: row.get("archived_time"),
            archive_id: row.get("archive_id"),
            created_at: row.get("created_at"),
        })
    }

    fn parse_detail(row: &SqliteRow) -> DbResult<RecordDetail> {
        let vault = match parse_optional_uuid(row.get("vault_local_id"))? {
            Some(id) => Some(VaultRef {
                id,
                vault_id: row.get("vault_external_id"),
                endpoint: row.get("vault_endpoint"),
            }),
            None => None,
        };

        Ok(RecordDetail {
            record: Self::parse_record(row)?,
            location: RecordLocation {
                host_name: row.get("host_name"),
                app_set_name: row.get("app_set_name"),
                path: row.get("path"),
                oss_endpoint: row.get("oss_endpoint"),
                bucket: row.get("bucket"),
                vault,
            },
        })
    }

}

fn expect_updated(rows_affected: u64) -> DbResult<()> {
    if rows_affected == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl RecordRepo for SqliteRecordRepo {
    async fn create(&self, input: CreateRecord) -> DbResult<Record> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO records (
                id, host_id, app_set_id, backup_set_id, path_id, filename,
                record_type, backup_time, archived_time, archive_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(input.host_id.to_string())
        .bind(input.app_set_id.to_string())
        .bind(input.backup_set_id.to_string())
        .bind(input.path_id.to_string())
        .bind(&input.filename)
        .bind(input.record_type.code())
        .bind(input.backup_time)
        .bind(input.archived_time)
        .bind(&input.archive_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Record {
            id,
            host_id: input.host_id,
            app_set_id: input.app_set_id,
            backup_set_id: input.backup_set_id,
            path_id: input.path_id,
            filename: input.filename,
            record_type: input.record_type,
            backup_time: input.backup_time,
            archived_time: input.archived_time,
            archive_id: input.archive_id,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Record>> {
        let row = sqlx::query(
            r#"
            SELECT id, host_id, app_set_id, backup_set_id, path_id, filename,
                   record_type, backup_time, archived_time, archive_id, created_at
            FROM records
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_record).transpose()
    }

    async fn get_detail(&self, id: Uuid) -> DbResult<Option<RecordDetail>> {
        let query = format!("{} WHERE r.id = ?", DETAIL_SELECT);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_detail).transpose()
    }

    async fn list_for_policy(&self, query: &RecordQuery) -> DbResult<Vec<RecordDetail>> {
        let time_column = match query.record_type {
            RecordType::Backup => "r.backup_time",
            RecordType::Archive => "r.archived_time",
        };

        let mut conditions = vec![
            "r.backup_set_id = ?".to_string(),
            "r.record_type = ?".to_string(),
            format!("{} IS NOT NULL", time_column),
            format!("{} <= ?", time_column),
        ];
        if query.window_start.is_some() {
            conditions.push(format!("{} >= ?", time_column));
        }
        if query.app_set_id.is_some() {
            conditions.push("r.app_set_id = ?".to_string());
        }
        if query.host_id.is_some() {
            conditions.push("r.host_id = ?".to_string());
        }
        if query.path_id.is_some() {
            conditions.push("r.path_id = ?".to_string());
        }

        let sql = format!(
            "{} WHERE {} ORDER BY {} ASC, r.id ASC",
            DETAIL_SELECT,
            conditions.join(" AND "),
            time_column
        );

        let mut q = sqlx::query(&sql)
            .bind(query.backup_set_id.to_string())
            .bind(query.record_type.code())
            .bind(query.window_end);
        if let Some(start) = query.window_start {
            q = q.bind(start);
        }
        if let Some(app_set_id) = query.app_set_id {
            q = q.bind(app_set_id.to_string());
        }
        if let Some(host_id) = query.host_id {
            q = q.bind(host_id.to_string());
        }
        if let Some(path_id) = query.path_id {
            q = q.bind(path_id.to_string());
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(Self::parse_detail).collect()
    }

    async fn convert_to_archive(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("UPDATE records SET record_type = ? WHERE id = ?")
            .bind(RecordType::Archive.code())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        expect_updated(result.rows_affected())
    }

    async fn restore_as_backup(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE records SET record_type = ?, backup_time = ? WHERE id = ?")
                .bind(RecordType::Backup.code())
                .bind(at)
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;

        expect_updated(result.rows_affected())
    }

    async fn set_archive_copy(
        &self,
        id: Uuid,
        archive_id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE records SET archive_id = ?, archived_time = ? WHERE id = ?")
                .bind(archive_id)
                .bind(at)
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;

        expect_updated(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM records WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        expect_updated(result.rows_affected())
    }
}
