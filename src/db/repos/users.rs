use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    db::error::DbResult,
    models::{ExpiredUser, ExpiringUser},
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Users whose last activity predates the cutoff, joined with their
    /// personal project.
    ///
    /// Last activity is the later of the `last_login` timestamp kept in the
    /// user's metadata and any API key use; users with no recorded login
    /// are never selected. Administrators are never reported. A user owning
    /// several personal projects yields one row per project.
    async fn find_expired(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<ExpiredUser>>;

    /// Non-admin users whose remaining retention time, measured against the
    /// given window in days, lands exactly on one of the thresholds. Users
    /// with no recorded activity at all are never reported.
    async fn find_expiring(
        &self,
        retention_days: i64,
        thresholds: &[i64],
    ) -> DbResult<Vec<ExpiringUser>>;

    /// Avatar and thumbnail blob references of the given users.
    async fn avatar_refs(&self, user_ids: &[i64]) -> DbResult<Vec<String>>;

    /// Delete the given user accounts; API keys and project memberships
    /// cascade.
    async fn delete_by_ids(&self, user_ids: &[i64]) -> DbResult<u64>;
}
