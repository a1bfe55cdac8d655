//! Log reclamation, driven by the `job.keepLogs` project attribute.
//!
//! Deletes expired logs per project, then tells the secondary stores:
//! the analyzer drops indexed documents older than the cutoff, and the
//! search engine drops the logs of every launch that aged past it. Both
//! are skipped when nothing was deleted so the analyzer never logs a
//! missing-index error. Finishes with the attachment stage, matching the
//! cascade order logs → attachments.

use chrono::{DateTime, Utc};

use crate::{
    config::JobSafety,
    jobs::{CleanerDeps, JobError, clean_attachments},
    retention::{self, RetentionKind},
};

pub const JOB_NAME: &str = "clean_logs";

/// One pass over every project with a log retention window, followed by
/// the attachment stage. Returns the number of logs deleted.
pub async fn run(deps: &CleanerDeps, safety: &JobSafety) -> Result<u64, JobError> {
    let deleted_total = remove_logs(deps, safety).await?;
    clean_attachments::run(deps, safety).await?;
    Ok(deleted_total)
}

/// The log stage alone, without the chained attachment stage.
pub(crate) async fn remove_logs(deps: &CleanerDeps, safety: &JobSafety) -> Result<u64, JobError> {
    let windows = retention::resolve(&deps.projects, RetentionKind::Logs).await?;

    let mut deleted_total = 0;
    for (project_id, window) in windows {
        let cutoff = Utc::now() - window;

        if safety.dry_run {
            tracing::info!(
                project_id,
                cutoff = %cutoff,
                "DRY RUN: Would delete expired logs"
            );
            continue;
        }

        match clean_project(deps, project_id, cutoff).await {
            Ok(deleted) => deleted_total += deleted,
            Err(e) => {
                tracing::error!(project_id, error = %e, "Failed to clean logs");
            }
        }
    }
    Ok(deleted_total)
}

async fn clean_project(
    deps: &CleanerDeps,
    project_id: i64,
    cutoff: DateTime<Utc>,
) -> Result<u64, JobError> {
    let deleted = deps.logs.delete_expired(project_id, cutoff).await?.len() as u64;
    if deleted == 0 {
        return Ok(0);
    }
    tracing::info!(project_id, deleted, "Deleted expired logs");

    deps.index.remove_from_index_less_than_log_date(project_id, cutoff).await?;

    let launch_ids = deps.launches.expired_ids(project_id, cutoff).await?;
    for launch_id in launch_ids {
        deps.search.delete_logs_by_launch_and_project(launch_id, project_id).await;
    }
    Ok(deleted)
}
