//! Shared worker loop: tick, take the lease, run, release.

use std::{future::Future, sync::Arc};

use crate::{config::JobSchedule, jobs::JobError, lease::LeaseService};

/// Starts a cleanup job as a background task.
///
/// Ticks on the schedule's interval and runs `run` only when the
/// cluster-wide lease for `name` is free; contention skips the cycle. Runs
/// indefinitely until the task is cancelled. A run's return value is the
/// number of rows it reclaimed.
pub async fn start_job_worker<F, Fut>(
    name: &'static str,
    schedule: JobSchedule,
    lease: Arc<LeaseService>,
    run: F,
) where
    F: Fn() -> Fut + Send,
    Fut: Future<Output = Result<u64, JobError>> + Send,
{
    if !schedule.enabled {
        tracing::info!(job = name, "Job disabled by configuration");
        return;
    }

    tracing::info!(
        job = name,
        interval_secs = schedule.interval_secs,
        lock_at_most_secs = schedule.lock_at_most_secs,
        "Starting job worker"
    );

    let interval = schedule.interval();

    loop {
        match lease.try_acquire(name, schedule.max_hold()).await {
            Ok(Some(held)) => {
                match run().await {
                    Ok(reclaimed) if reclaimed > 0 => {
                        tracing::info!(job = name, reclaimed, "Job run complete");
                    }
                    Ok(_) => {
                        tracing::debug!(job = name, "Job run complete, nothing to reclaim");
                    }
                    Err(e) => {
                        tracing::error!(job = name, error = %e, "Job run failed");
                    }
                }
                if let Err(e) = lease.release(&held).await {
                    // The lease still lapses at lock_until.
                    tracing::warn!(job = name, error = %e, "Failed to release job lease");
                }
            }
            Ok(None) => {
                tracing::debug!(job = name, "Lease held elsewhere, skipping cycle");
            }
            Err(e) => {
                tracing::error!(job = name, error = %e, "Failed to acquire job lease");
            }
        }

        tokio::time::sleep(interval).await;
    }
}
