use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::{
    db::{error::DbResult, repos::AttachmentRepo},
    models::DeletionRecord,
};

pub struct PostgresAttachmentRepo {
    pool: PgPool,
}

impl PostgresAttachmentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttachmentRepo for PostgresAttachmentRepo {
    async fn move_expired_to_deletion(
        &self,
        project_id: i64,
        cutoff: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            WITH moved AS (
                DELETE FROM attachment
                WHERE project_id = $1
                  AND creation_date <= $2
                  AND COALESCE(
                        (SELECT l.retention_policy FROM launch l WHERE l.id = attachment.launch_id),
                        'REGULAR'
                      ) != 'IMPORTANT'
                RETURNING id, file_id, thumbnail_id, creation_date
            )
            INSERT INTO attachment_deletion
                (id, file_id, thumbnail_id, creation_attachment_date, deletion_date)
            SELECT id, file_id, thumbnail_id, creation_date, now() FROM moved
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn move_by_project_ids(&self, project_ids: &[i64]) -> DbResult<u64> {
        if project_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            WITH moved AS (
                DELETE FROM attachment
                WHERE project_id = ANY($1)
                RETURNING id, file_id, thumbnail_id, creation_date
            )
            INSERT INTO attachment_deletion
                (id, file_id, thumbnail_id, creation_attachment_date, deletion_date)
            SELECT id, file_id, thumbnail_id, creation_date, now() FROM moved
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(project_ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn peek_deletion_chunk(&self, limit: u32) -> DbResult<Vec<DeletionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, file_id, thumbnail_id, creation_attachment_date, deletion_date
            FROM attachment_deletion
            ORDER BY id
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DeletionRecord {
                id: row.get("id"),
                file_id: row.get("file_id"),
                thumbnail_id: row.get("thumbnail_id"),
                creation_attachment_date: row.get("creation_attachment_date"),
                deletion_date: row.get("deletion_date"),
            })
            .collect())
    }

    async fn remove_deletion_records(&self, ids: &[i64]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM attachment_deletion WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
