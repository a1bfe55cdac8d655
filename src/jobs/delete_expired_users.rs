//! Expired-user reclamation.
//!
//! Non-admin users whose last login and API-key use both predate the
//! retention border are deleted together with their personal projects.
//! Memberships and API keys cascade with the user rows; the shared
//! projects an affected user belonged to are listed beforehand so the
//! unassignment activity events can still be published. Personal projects
//! get the full teardown: attachments to the tombstone queue, custom issue
//! types dropped, analyzer indexes removed, then the project rows. Each
//! deleted user is notified by a templated email request on the bus.

use chrono::{Duration, Utc};

use crate::{
    clients::decode_blob_ref,
    config::{JobSafety, RetentionJobConfig},
    events::ActivityEvent,
    jobs::{CleanerDeps, JobError},
    models::EmailNotificationRequest,
};

pub const JOB_NAME: &str = "delete_expired_users";

const EMAIL_TEMPLATE: &str = "userDeletionNotification";

/// One pass over expired users. Returns the number of users deleted.
pub async fn run(
    deps: &CleanerDeps,
    config: &RetentionJobConfig,
    safety: &JobSafety,
) -> Result<u64, JobError> {
    let Some(days) = config.retention_days.filter(|days| *days > 0) else {
        tracing::debug!("User retention period is not configured, skipping");
        return Ok(0);
    };

    let border = Utc::now() - Duration::days(days);
    let expired = deps.users.find_expired(border).await?;
    if expired.is_empty() {
        return Ok(0);
    }

    let mut user_ids: Vec<i64> = expired.iter().map(|u| u.user_id).collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    let mut emails: Vec<String> = expired.iter().map(|u| u.email.clone()).collect();
    emails.sort();
    emails.dedup();

    let mut personal_projects: Vec<i64> =
        expired.iter().filter_map(|u| u.personal_project_id).collect();
    personal_projects.sort_unstable();
    personal_projects.dedup();

    if safety.dry_run {
        tracing::info!(
            users = user_ids.len(),
            personal_projects = personal_projects.len(),
            border = %border,
            "DRY RUN: Would delete expired users"
        );
        return Ok(0);
    }

    delete_avatars(deps, &user_ids).await;

    // Queried before the user delete; the memberships cascade with it.
    let shared_projects = deps.projects.non_personal_project_ids(&user_ids).await?;

    let deleted_users = deps.users.delete_by_ids(&user_ids).await?;
    tracing::info!(deleted_users, "Deleted expired users");
    if deleted_users > 0 {
        deps.bus
            .publish_activity(ActivityEvent::UserDeleted {
                count: deleted_users as usize,
            })
            .await;
    }
    for project_id in shared_projects {
        deps.bus.publish_activity(ActivityEvent::UserUnassigned { project_id }).await;
    }

    if !personal_projects.is_empty() {
        delete_personal_projects(deps, &personal_projects).await?;
    }

    let notifications: Vec<EmailNotificationRequest> = emails
        .iter()
        .map(|email| EmailNotificationRequest::new(email, EMAIL_TEMPLATE))
        .collect();
    deps.bus.publish_email_notifications(&notifications).await;

    Ok(deleted_users)
}

/// Best-effort removal of avatar and thumbnail blobs. The user rows go
/// regardless; a leaked avatar is preferable to a kept account.
async fn delete_avatars(deps: &CleanerDeps, user_ids: &[i64]) {
    let refs = match deps.users.avatar_refs(user_ids).await {
        Ok(refs) => refs,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read avatar refs");
            return;
        }
    };

    let mut paths = Vec::with_capacity(refs.len());
    for file_ref in &refs {
        match decode_blob_ref(file_ref) {
            Ok(path) if !path.is_empty() => paths.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping undecodable avatar ref"),
        }
    }
    if let Err(e) = deps.blobs.delete_all(&paths).await {
        tracing::warn!(error = %e, "Failed to delete avatar blobs");
    }
}

async fn delete_personal_projects(
    deps: &CleanerDeps,
    project_ids: &[i64],
) -> Result<(), JobError> {
    deps.attachments.move_by_project_ids(project_ids).await?;
    deps.projects.delete_custom_issue_types(project_ids).await?;

    for &project_id in project_ids {
        // Index teardown is advisory; the analyzer tolerates re-deletes.
        if let Err(e) = deps.index.remove_suggest(project_id).await {
            tracing::warn!(project_id, error = %e, "Failed to remove suggest index");
        }
        if let Err(e) = deps.index.delete_index(project_id).await {
            tracing::warn!(project_id, error = %e, "Failed to delete analyzer index");
        }
    }

    let deleted = deps.projects.delete_by_ids(project_ids).await?;
    tracing::info!(deleted, "Deleted personal projects of expired users");
    if deleted > 0 {
        deps.bus
            .publish_activity(ActivityEvent::ProjectsDeleted {
                count: deleted as usize,
            })
            .await;
    }
    Ok(())
}
