//! Activity-event retention: drop audit rows older than a flat window.
//!
//! No secondary-store fan-out; activity events live only in Postgres.

use chrono::{Duration, Utc};

use crate::{
    config::{JobSafety, RetentionJobConfig},
    jobs::{CleanerDeps, JobError},
};

pub const JOB_NAME: &str = "events_retention";

/// Rows per delete statement, keeping lock times short on big backlogs.
const DELETE_BATCH_SIZE: u32 = 10_000;

/// One pass over the activity table. Returns the number of rows deleted.
pub async fn run(
    deps: &CleanerDeps,
    config: &RetentionJobConfig,
    safety: &JobSafety,
) -> Result<u64, JobError> {
    let Some(days) = config.retention_days.filter(|days| *days > 0) else {
        tracing::info!("Events retention period is not configured, skipping");
        return Ok(0);
    };

    let cutoff = Utc::now() - Duration::days(days);

    if safety.dry_run {
        tracing::info!(cutoff = %cutoff, "DRY RUN: Would delete activity events");
        return Ok(0);
    }

    let deleted = deps.activity.delete_before(cutoff, DELETE_BATCH_SIZE).await?;
    if deleted > 0 {
        tracing::info!(deleted, cutoff = %cutoff, "Deleted expired activity events");
    }
    Ok(deleted)
}
