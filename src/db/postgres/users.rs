use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::{
    db::{error::DbResult, repos::UserRepo},
    models::{ExpiredUser, ExpiringUser},
};

pub struct PostgresUserRepo {
    pool: PgPool,
}

impl PostgresUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PostgresUserRepo {
    async fn find_expired(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<ExpiredUser>> {
        // last_login lives in user metadata as epoch milliseconds; a user
        // with no recorded login is never selected. Any API key use after
        // the cutoff keeps the account alive.
        let rows = sqlx::query(
            r#"
            SELECT u.id AS user_id, p.id AS personal_project_id, u.email
            FROM users u
            LEFT JOIN project p
                   ON p.name = u.login || '_personal' AND p.project_type = 'PERSONAL'
            WHERE u.role != 'ADMINISTRATOR'
              AND (u.metadata -> 'metadata' ->> 'last_login')::bigint <= $2
              AND NOT EXISTS (
                    SELECT 1 FROM api_keys ak
                    WHERE ak.user_id = u.id AND ak.last_used_at > $1
                  )
            ORDER BY u.id, p.id
            "#,
        )
        .bind(cutoff)
        .bind(cutoff.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ExpiredUser {
                user_id: row.get("user_id"),
                personal_project_id: row.get("personal_project_id"),
                email: row.get("email"),
            })
            .collect())
    }

    async fn find_expiring(
        &self,
        retention_days: i64,
        thresholds: &[i64],
    ) -> DbResult<Vec<ExpiringUser>> {
        // Inactivity is counted in whole days from the later of last_login
        // and the freshest API-key use. GREATEST skips NULLs, so a user with
        // either signal is covered; a user with neither resolves to NULL and
        // never matches a threshold.
        let rows = sqlx::query(
            r#"
            WITH user_last_action AS (
                SELECT u.id AS user_id,
                       u.email,
                       DATE_PART('day', NOW() - GREATEST(
                           DATE(to_timestamp(
                               (u.metadata -> 'metadata' ->> 'last_login')::bigint / 1000)),
                           MAX(ak.last_used_at)))::bigint AS inactivity_days
                FROM users u
                LEFT JOIN api_keys ak ON ak.user_id = u.id
                WHERE u.role != 'ADMINISTRATOR'
                GROUP BY u.id
            )
            SELECT email, inactivity_days, $1 - inactivity_days AS remaining_days
            FROM user_last_action
            WHERE $1 - inactivity_days = ANY($2)
            "#,
        )
        .bind(retention_days)
        .bind(thresholds)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ExpiringUser {
                email: row.get("email"),
                inactivity_days: row.get("inactivity_days"),
                remaining_days: row.get("remaining_days"),
            })
            .collect())
    }

    async fn avatar_refs(&self, user_ids: &[i64]) -> DbResult<Vec<String>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT attachment, attachment_thumbnail FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut refs = Vec::new();
        for row in rows {
            if let Some(file_ref) = row.get::<Option<String>, _>("attachment") {
                refs.push(file_ref);
            }
            if let Some(thumb_ref) = row.get::<Option<String>, _>("attachment_thumbnail") {
                refs.push(thumb_ref);
            }
        }
        Ok(refs)
    }

    async fn delete_by_ids(&self, user_ids: &[i64]) -> DbResult<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(user_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
