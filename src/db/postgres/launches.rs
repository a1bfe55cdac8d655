use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::db::{error::DbResult, repos::LaunchRepo};

pub struct PostgresLaunchRepo {
    pool: PgPool,
}

impl PostgresLaunchRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LaunchRepo for PostgresLaunchRepo {
    async fn expired_ids(&self, project_id: i64, cutoff: DateTime<Utc>) -> DbResult<Vec<i64>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM launch
            WHERE project_id = $1 AND start_time <= $2 AND retention_policy = 'REGULAR'
            ORDER BY id
            "#,
        )
        .bind(project_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }

    async fn delete_clusters(&self, launch_ids: &[i64]) -> DbResult<u64> {
        if launch_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM clusters WHERE launch_id = ANY($1)")
            .bind(launch_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_ids(&self, launch_ids: &[i64]) -> DbResult<u64> {
        if launch_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM launch WHERE id = ANY($1)")
            .bind(launch_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
