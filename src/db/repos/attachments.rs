use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{db::error::DbResult, models::DeletionRecord};

#[async_trait]
pub trait AttachmentRepo: Send + Sync {
    /// Move attachments in the project older than the cutoff into the
    /// `attachment_deletion` tombstone queue, skipping attachments whose
    /// launch has the IMPORTANT retention policy. Returns the number moved.
    ///
    /// The blobs themselves stay put; the storage sweep deletes them later
    /// from the tombstone queue.
    async fn move_expired_to_deletion(
        &self,
        project_id: i64,
        cutoff: DateTime<Utc>,
    ) -> DbResult<u64>;

    /// Move every attachment of the given projects into the tombstone
    /// queue. Used before project deletion so blob references survive the
    /// cascade.
    async fn move_by_project_ids(&self, project_ids: &[i64]) -> DbResult<u64>;

    /// Read up to `limit` tombstone rows, oldest first, without removing
    /// them. A row disappears only after its blobs are confirmed gone.
    async fn peek_deletion_chunk(&self, limit: u32) -> DbResult<Vec<DeletionRecord>>;

    /// Remove the given tombstone rows.
    async fn remove_deletion_records(&self, ids: &[i64]) -> DbResult<u64>;
}
