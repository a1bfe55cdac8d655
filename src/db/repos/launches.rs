use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::error::DbResult;

#[async_trait]
pub trait LaunchRepo: Send + Sync {
    /// Ids of REGULAR-retention launches in the project that started on or
    /// before the cutoff. IMPORTANT launches are never reclaimed.
    async fn expired_ids(&self, project_id: i64, cutoff: DateTime<Utc>) -> DbResult<Vec<i64>>;

    /// Delete cluster rows referencing the given launches. Clusters carry no
    /// cascading foreign key, so they go first.
    async fn delete_clusters(&self, launch_ids: &[i64]) -> DbResult<u64>;

    /// Delete the given launches; test items and logs cascade.
    async fn delete_by_ids(&self, launch_ids: &[i64]) -> DbResult<u64>;
}
