use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{parse_code, parse_uuid};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::PolicyRepo,
    },
    models::{CreatePolicy, Policy, PolicyAction, PolicyTarget},
};

/// Filter set join tables and the member column each one holds.
const FILTER_TABLES: [(&str, &str); 3] = [
    ("policy_app_sets", "app_set_id"),
    ("policy_hosts", "host_id"),
    ("policy_paths", "path_id"),
];

#[derive(Default)]
struct Filters {
    app_set_ids: Vec<Uuid>,
    host_ids: Vec<Uuid>,
    path_ids: Vec<Uuid>,
}

impl Filters {
    fn slot(&mut self, table: &str) -> &mut Vec<Uuid> {
        match table {
            "policy_app_sets" => &mut self.app_set_ids,
            "policy_hosts" => &mut self.host_ids,
            _ => &mut self.path_ids,
        }
    }
}

pub struct SqlitePolicyRepo {
    pool: SqlitePool,
}

impl SqlitePolicyRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_policy(row: &SqliteRow, filters: Filters) -> DbResult<Policy> {
        Ok(Policy {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            name: row.get("name"),
            target: parse_code("target", row.get("target"), PolicyTarget::from_code)?,
            action: parse_code("action", row.get("action"), PolicyAction::from_code)?,
            target_start: row.get("target_start"),
            target_end: row.get("target_end"),
            step: row.get("step"),
            backup_set_id: parse_uuid(&row.get::<String, _>("backup_set_id"))?,
            app_set_ids: filters.app_set_ids,
            host_ids: filters.host_ids,
            path_ids: filters.path_ids,
            created_at: row.get("created_at"),
        })
    }

    /// Load filter sets, optionally for a single policy, keyed by policy id.
    async fn load_filters(&self, policy_id: Option<Uuid>) -> DbResult<HashMap<Uuid, Filters>> {
        let mut filters: HashMap<Uuid, Filters> = HashMap::new();

        for (table, column) in FILTER_TABLES {
            let query = match policy_id {
                Some(_) => format!(
                    "SELECT policy_id, {column} AS member FROM {table} WHERE policy_id = ? ORDER BY {column}"
                ),
                None => format!("SELECT policy_id, {column} AS member FROM {table} ORDER BY {column}"),
            };

            let mut q = sqlx::query(&query);
            if let Some(id) = policy_id {
                q = q.bind(id.to_string());
            }

            for row in q.fetch_all(&self.pool).await? {
                let owner = parse_uuid(&row.get::<String, _>("policy_id"))?;
                let member = parse_uuid(&row.get::<String, _>("member"))?;
                filters.entry(owner).or_default().slot(table).push(member);
            }
        }

        Ok(filters)
    }
}

#[async_trait]
impl PolicyRepo for SqlitePolicyRepo {
    async fn create(&self, input: CreatePolicy) -> DbResult<Policy> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO policies (
                id, name, target, action, target_start, target_end, step,
                backup_set_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&input.name)
        .bind(input.target.code())
        .bind(input.action.code())
        .bind(input.target_start)
        .bind(input.target_end)
        .bind(input.step)
        .bind(input.backup_set_id.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let members = [&input.app_set_ids, &input.host_ids, &input.path_ids];
        for ((table, column), ids) in FILTER_TABLES.into_iter().zip(members) {
            let query = format!("INSERT INTO {table} (policy_id, {column}) VALUES (?, ?)");
            for member in ids {
                sqlx::query(&query)
                    .bind(id.to_string())
                    .bind(member.to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| match e {
                        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                            DbError::Conflict(format!("Duplicate {} '{}' in policy", column, member))
                        }
                        _ => DbError::from(e),
                    })?;
            }
        }

        tx.commit().await?;

        Ok(Policy {
            id,
            name: input.name,
            target: input.target,
            action: input.action,
            target_start: input.target_start,
            target_end: input.target_end,
            step: input.step,
            backup_set_id: input.backup_set_id,
            app_set_ids: input.app_set_ids,
            host_ids: input.host_ids,
            path_ids: input.path_ids,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Policy>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, target, action, target_start, target_end, step,
                   backup_set_id, created_at
            FROM policies
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut filters = self.load_filters(Some(id)).await?;
        let policy = Self::parse_policy(&row, filters.remove(&id).unwrap_or_default())?;
        Ok(Some(policy))
    }

    async fn list(&self) -> DbResult<Vec<Policy>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, target, action, target_start, target_end, step,
                   backup_set_id, created_at
            FROM policies
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut filters = self.load_filters(None).await?;

        rows.iter()
            .map(|row| {
                let id = parse_uuid(&row.get::<String, _>("id"))?;
                Self::parse_policy(row, filters.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM policies WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}
