use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::db::{
    error::DbResult,
    repos::{AttributeValue, ProjectRepo},
};

/// Locators of the issue types shipped with every installation. These rows
/// are shared across projects and must survive project deletion.
const SYSTEM_ISSUE_TYPE_LOCATORS: [&str; 5] = ["pb001", "ab001", "si001", "ti001", "nd001"];

pub struct PostgresProjectRepo {
    pool: PgPool,
}

impl PostgresProjectRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepo for PostgresProjectRepo {
    async fn attribute_values(&self, attribute: &str) -> DbResult<Vec<AttributeValue>> {
        let rows = sqlx::query(
            r#"
            SELECT pa.project_id, pa.value
            FROM project_attribute pa
            JOIN attribute a ON a.id = pa.attribute_id
            WHERE a.name = $1
            "#,
        )
        .bind(attribute)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AttributeValue {
                project_id: row.get("project_id"),
                value: row.get("value"),
            })
            .collect())
    }

    async fn delete_by_ids(&self, project_ids: &[i64]) -> DbResult<u64> {
        if project_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM project WHERE id = ANY($1)")
            .bind(project_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_custom_issue_types(&self, project_ids: &[i64]) -> DbResult<u64> {
        if project_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            DELETE FROM issue_type it
            USING issue_type_project itp
            WHERE itp.issue_type_id = it.id
              AND itp.project_id = ANY($1)
              AND it.locator != ALL($2)
            "#,
        )
        .bind(project_ids)
        .bind(&SYSTEM_ISSUE_TYPE_LOCATORS[..])
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn non_personal_project_ids(&self, user_ids: &[i64]) -> DbResult<Vec<i64>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT p.id
            FROM project_user pu
            JOIN project p ON p.id = pu.project_id
            WHERE p.project_type != 'PERSONAL' AND pu.user_id = ANY($1)
            ORDER BY p.id
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }
}
