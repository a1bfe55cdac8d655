use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::{error::DbResult, repos::LockRepo};

pub struct PostgresLockRepo {
    pool: PgPool,
}

impl PostgresLockRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LockRepo for PostgresLockRepo {
    async fn try_acquire(
        &self,
        name: &str,
        holder: &str,
        now: DateTime<Utc>,
        lock_until: DateTime<Utc>,
    ) -> DbResult<bool> {
        // Single conditional upsert: the insert wins when the name is free,
        // the update wins only over an expired row. rows_affected is 0 when
        // another holder still owns the lock.
        let result = sqlx::query(
            r#"
            INSERT INTO scheduler_lock (name, locked_by, locked_at, lock_until)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE
            SET locked_by = EXCLUDED.locked_by,
                locked_at = EXCLUDED.locked_at,
                lock_until = EXCLUDED.lock_until
            WHERE scheduler_lock.lock_until <= $3
            "#,
        )
        .bind(name)
        .bind(holder)
        .bind(now)
        .bind(lock_until)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, name: &str, holder: &str, now: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE scheduler_lock
            SET lock_until = $3
            WHERE name = $1 AND locked_by = $2 AND lock_until > $3
            "#,
        )
        .bind(name)
        .bind(holder)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
