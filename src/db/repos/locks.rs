use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::error::DbResult;

/// Cluster-wide named locks backed by the `scheduler_lock` table.
///
/// A lock is held until its `lock_until` timestamp passes; there is no
/// active release requirement, so a crashed holder frees the name by simply
/// letting it expire.
#[async_trait]
pub trait LockRepo: Send + Sync {
    /// Try to take the named lock until `lock_until`.
    ///
    /// Succeeds when no row exists for the name or the existing row has
    /// expired (its `lock_until` is at or before `now`). The row update is
    /// a single conditional upsert, so two contenders can never both win.
    async fn try_acquire(
        &self,
        name: &str,
        holder: &str,
        now: DateTime<Utc>,
        lock_until: DateTime<Utc>,
    ) -> DbResult<bool>;

    /// Release the named lock by expiring it, if still held by `holder`.
    async fn release(&self, name: &str, holder: &str, now: DateTime<Utc>) -> DbResult<()>;
}
