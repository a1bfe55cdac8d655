use async_trait::async_trait;

use super::AttributeValue;
use crate::db::error::DbResult;

#[async_trait]
pub trait ProjectRepo: Send + Sync {
    /// Fetch the value of the named attribute for every project that has it.
    ///
    /// Retention attributes (`job.keepLaunches`, `job.keepLogs`,
    /// `job.keepScreenshots`) hold a number of seconds as text.
    async fn attribute_values(&self, attribute: &str) -> DbResult<Vec<AttributeValue>>;

    /// Delete the given projects. Project-scoped rows (attributes,
    /// memberships) go with them via cascading foreign keys.
    async fn delete_by_ids(&self, project_ids: &[i64]) -> DbResult<u64>;

    /// Delete issue types belonging to the given projects, keeping the
    /// built-in system types (locators pb001, ab001, si001, ti001, nd001)
    /// which are shared across projects.
    async fn delete_custom_issue_types(&self, project_ids: &[i64]) -> DbResult<u64>;

    /// Non-personal projects any of the given users is assigned to. The
    /// memberships themselves cascade with user deletion; this list only
    /// drives the unassignment activity events.
    async fn non_personal_project_ids(&self, user_ids: &[i64]) -> DbResult<Vec<i64>>;
}
