use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::db::{error::DbResult, repos::LogRepo};

pub struct PostgresLogRepo {
    pool: PgPool,
}

impl PostgresLogRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogRepo for PostgresLogRepo {
    async fn delete_expired(&self, project_id: i64, cutoff: DateTime<Utc>) -> DbResult<Vec<i64>> {
        // The effective launch of a log attached to a test item is resolved
        // through the item, following retry_of to the original item. A log
        // whose effective launch cannot be resolved is kept: only a launch
        // known to carry REGULAR retention makes its logs eligible.
        let rows = sqlx::query(
            r#"
            DELETE FROM log
            WHERE project_id = $1
              AND log_time <= $2
              AND COALESCE(
                    (SELECT l.retention_policy FROM launch l WHERE l.id = log.launch_id),
                    (SELECT l.retention_policy
                     FROM launch l
                     JOIN test_item ti ON ti.launch_id = l.id
                     WHERE ti.item_id = COALESCE(
                        (SELECT ti2.retry_of FROM test_item ti2 WHERE ti2.item_id = log.item_id),
                        log.item_id))
                  ) = 'REGULAR'
            RETURNING id
            "#,
        )
        .bind(project_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }
}
