use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::{error::DbResult, repos::ActivityRepo};

pub struct PostgresActivityRepo {
    pool: PgPool,
}

impl PostgresActivityRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepo for PostgresActivityRepo {
    async fn delete_before(&self, cutoff: DateTime<Utc>, batch_size: u32) -> DbResult<u64> {
        let mut total: u64 = 0;

        // ctid-batched delete keeps each statement's lock footprint small.
        loop {
            let result = sqlx::query(
                r#"
                DELETE FROM activity
                WHERE ctid IN (
                    SELECT ctid FROM activity
                    WHERE created_at < $1
                    LIMIT $2
                )
                "#,
            )
            .bind(cutoff)
            .bind(batch_size as i64)
            .execute(&self.pool)
            .await?;

            let deleted = result.rows_affected();
            total += deleted;
            if deleted < batch_size as u64 {
                break;
            }
        }

        Ok(total)
    }
}
