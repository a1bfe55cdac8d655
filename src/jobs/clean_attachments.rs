//! Attachment reclamation: move expired attachment rows into the
//! tombstone queue.
//!
//! Driven by the `job.keepScreenshots` project attribute. Only the
//! database rows move here; the storage sweep deletes the blobs from the
//! tombstone queue later, so a crash between the two leaves nothing
//! orphaned.

use chrono::Utc;

use crate::{
    config::JobSafety,
    jobs::{CleanerDeps, JobError},
    retention::{self, RetentionKind},
};

pub const JOB_NAME: &str = "clean_attachments";

/// One pass over every project with an attachment retention window.
/// Returns the number of rows moved to the tombstone queue.
pub async fn run(deps: &CleanerDeps, safety: &JobSafety) -> Result<u64, JobError> {
    let windows = retention::resolve(&deps.projects, RetentionKind::Attachments).await?;

    let mut moved_total = 0;
    for (project_id, window) in windows {
        let cutoff = Utc::now() - window;

        if safety.dry_run {
            tracing::info!(
                project_id,
                cutoff = %cutoff,
                "DRY RUN: Would move expired attachments to the deletion queue"
            );
            continue;
        }

        match deps.attachments.move_expired_to_deletion(project_id, cutoff).await {
            Ok(moved) => {
                if moved > 0 {
                    tracing::info!(project_id, moved, "Moved attachments to the deletion queue");
                }
                moved_total += moved;
            }
            Err(e) => {
                // Next tenant still gets its cleanup.
                tracing::error!(
                    project_id,
                    error = %e,
                    "Failed to move expired attachments"
                );
            }
        }
    }
    Ok(moved_total)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::jobs::fakes::{FakeDeps, FakeProjectRepo};

    fn deps_with_windows(attachments: crate::jobs::fakes::FakeAttachmentRepo) -> FakeDeps {
        FakeDeps {
            projects: Arc::new(
                FakeProjectRepo::default()
                    .with_attribute("job.keepScreenshots", 1, Some("86400"))
                    .with_attribute("job.keepScreenshots", 2, Some("not-a-number")),
            ),
            attachments: Arc::new(attachments),
            ..FakeDeps::default()
        }
    }

    #[tokio::test]
    async fn moves_expired_attachments_for_configured_projects() {
        let fakes = deps_with_windows(
            crate::jobs::fakes::FakeAttachmentRepo::default()
                .with_expired(1, 12)
                .with_expired(2, 99),
        );

        let moved = run(&fakes.deps(), &JobSafety::default()).await.unwrap();

        // Project 2 has an invalid window and is skipped.
        assert_eq!(moved, 12);
    }

    #[tokio::test]
    async fn rerun_moves_nothing() {
        let fakes =
            deps_with_windows(crate::jobs::fakes::FakeAttachmentRepo::default().with_expired(1, 5));
        let deps = fakes.deps();

        assert_eq!(run(&deps, &JobSafety::default()).await.unwrap(), 5);
        assert_eq!(run(&deps, &JobSafety::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dry_run_touches_nothing() {
        let fakes =
            deps_with_windows(crate::jobs::fakes::FakeAttachmentRepo::default().with_expired(1, 5));
        let safety = JobSafety { dry_run: true };

        assert_eq!(run(&fakes.deps(), &safety).await.unwrap(), 0);
        // The rows are still eligible for a real run.
        assert_eq!(run(&fakes.deps(), &JobSafety::default()).await.unwrap(), 5);
    }
}
