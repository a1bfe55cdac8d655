//! Cluster-wide job leases on top of the `scheduler_lock` table.
//!
//! Every instance triggers every enabled job on its own interval; the lease
//! decides which instance actually runs it. Acquisition is a single atomic
//! upsert, so at most one holder wins per cycle. Expiry is passive: a
//! crashed holder frees the job name when its `lock_until` passes, and
//! because every delete is idempotent the next run simply picks up where
//! the crashed one stopped.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::db::{DbResult, LockRepo};

/// A held lease. Dropping it does not release the lock; call
/// [`LeaseService::release`] or let it expire.
#[derive(Debug, Clone)]
pub struct Lease {
    pub name: String,
    pub lock_until: DateTime<Utc>,
}

/// Acquires and releases named leases on behalf of this instance.
pub struct LeaseService {
    locks: Arc<dyn LockRepo>,
    holder: String,
}

impl LeaseService {
    pub fn new(locks: Arc<dyn LockRepo>) -> Self {
        Self {
            locks,
            holder: holder_id(),
        }
    }

    /// Identifier recorded in `locked_by` for rows this instance takes.
    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Try to take the named lease for at most `max_hold`.
    ///
    /// Returns `None` when another instance holds an unexpired lease, in
    /// which case the caller skips this cycle.
    pub async fn try_acquire(&self, name: &str, max_hold: Duration) -> DbResult<Option<Lease>> {
        let now = Utc::now();
        let lock_until = now + max_hold;

        if self.locks.try_acquire(name, &self.holder, now, lock_until).await? {
            debug!(lease = name, holder = %self.holder, "Lease acquired");
            Ok(Some(Lease {
                name: name.to_string(),
                lock_until,
            }))
        } else {
            debug!(lease = name, "Lease held elsewhere, skipping cycle");
            Ok(None)
        }
    }

    /// Release a held lease so the next cycle does not have to wait for
    /// expiry.
    pub async fn release(&self, lease: &Lease) -> DbResult<()> {
        self.locks.release(&lease.name, &self.holder, Utc::now()).await?;
        debug!(lease = %lease.name, "Lease released");
        Ok(())
    }
}

/// Unique holder id: hostname plus a per-process random suffix, so two
/// instances on one host never collide.
fn holder_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}/{}", host, uuid::Uuid::new_v4())
}
