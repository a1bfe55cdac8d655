use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::error::DbResult;

#[async_trait]
pub trait ActivityRepo: Send + Sync {
    /// Delete activity events created before the cutoff.
    ///
    /// Deletes in batches to avoid long-held locks. Returns the total
    /// number of rows deleted.
    async fn delete_before(&self, cutoff: DateTime<Utc>, batch_size: u32) -> DbResult<u64>;
}
