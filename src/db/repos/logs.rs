use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::error::DbResult;

#[async_trait]
pub trait LogRepo: Send + Sync {
    /// Delete logs in the project older than the cutoff whose effective
    /// launch has the REGULAR retention policy, returning the deleted ids.
    ///
    /// The effective launch is the log's own launch when set, otherwise the
    /// launch of its test item, following `retry_of` to the original item
    /// for retries. Logs under IMPORTANT launches are left alone, as are
    /// logs whose effective launch cannot be resolved at all.
    async fn delete_expired(&self, project_id: i64, cutoff: DateTime<Utc>) -> DbResult<Vec<i64>>;
}
