//! Launch reclamation, driven by the `job.keepLaunches` project attribute.
//!
//! Launches past their window are deleted together with everything that
//! hangs off them: cluster rows first (no cascading key), then the
//! launches themselves (test items and logs cascade). The analyzer and
//! search engine are told afterwards, per launch. IMPORTANT launches are
//! exempt regardless of age. The run finishes with the log stage, which in
//! turn finishes with the attachment stage.

use chrono::{DateTime, Utc};

use crate::{
    config::JobSafety,
    jobs::{CleanerDeps, JobError, clean_logs},
    retention::{self, RetentionKind},
};

pub const JOB_NAME: &str = "clean_launches";

/// One pass over every project with a launch retention window, followed by
/// the log and attachment stages. Returns the number of launches deleted.
pub async fn run(deps: &CleanerDeps, safety: &JobSafety) -> Result<u64, JobError> {
    let deleted_total = remove_launches(deps, safety).await?;
    clean_logs::run(deps, safety).await?;
    Ok(deleted_total)
}

async fn remove_launches(deps: &CleanerDeps, safety: &JobSafety) -> Result<u64, JobError> {
    let windows = retention::resolve(&deps.projects, RetentionKind::Launches).await?;

    let mut deleted_total = 0;
    for (project_id, window) in windows {
        let cutoff = Utc::now() - window;

        if safety.dry_run {
            tracing::info!(
                project_id,
                cutoff = %cutoff,
                "DRY RUN: Would delete expired launches"
            );
            continue;
        }

        match clean_project(deps, project_id, cutoff).await {
            Ok(deleted) => deleted_total += deleted,
            Err(e) => {
                tracing::error!(project_id, error = %e, "Failed to clean launches");
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
    let launch_ids = deps.launches.expired_ids(project_id, cutoff).await?;
    if launch_ids.is_empty() {
        return Ok(0);
    }

    deps.launches.delete_clusters(&launch_ids).await?;
    let deleted = deps.launches.delete_by_ids(&launch_ids).await?;
    if deleted == 0 {
        return Ok(0);
    }
    tracing::info!(project_id, deleted, "Deleted expired launches");

    deps.index.remove_from_index_less_than_launch_date(project_id, cutoff).await?;
    for launch_id in launch_ids {
        deps.search.delete_logs_by_launch_and_project(launch_id, project_id).await;
    }
    Ok(deleted)
}
