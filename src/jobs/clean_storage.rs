//! Storage sweep: physically delete the blobs of tombstoned attachments.
//!
//! Drains the `attachment_deletion` queue in chunks. Tombstone rows are
//! peeked, their blobs deleted, and only then are the rows removed, so a
//! crash mid-chunk re-deletes the same blobs on the next run instead of
//! leaking them. A missing blob counts as deleted; any other storage error
//! leaves the chunk's rows in place for the next run.

use crate::{
    clients::decode_blob_ref,
    config::{CleanStorageConfig, JobSafety},
    jobs::{CleanerDeps, JobError},
    models::DeletionRecord,
};

pub const JOB_NAME: &str = "clean_storage";

/// One sweep over the tombstone queue, bounded by the configured
/// `chunk_size`. Returns the number of tombstone rows removed.
pub async fn run(
    deps: &CleanerDeps,
    config: &CleanStorageConfig,
    safety: &JobSafety,
) -> Result<u64, JobError> {
    let batch_size = config.batch_size();
    let chunk_size = config.chunk_size as u64;

    let mut removed_total: u64 = 0;
    let mut batch_number: u64 = 1;
    while batch_number * batch_size as u64 <= chunk_size {
        let records = deps.attachments.peek_deletion_chunk(batch_size).await?;
        if records.is_empty() {
            break;
        }

        if safety.dry_run {
            tracing::info!(
                count = records.len(),
                "DRY RUN: Would delete blobs of tombstoned attachments"
            );
            break;
        }

        let paths = blob_paths(&records);
        if let Err(e) = deps.blobs.delete_all(&paths).await {
            // Rows stay queued; the next run retries the whole chunk.
            tracing::warn!(error = %e, "Blob deletion failed, leaving chunk queued");
            break;
        }

        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let removed = deps.attachments.remove_deletion_records(&ids).await?;
        removed_total += removed;
        tracing::info!(iteration = batch_number, removed, "Swept attachment blobs");

        if records.len() < batch_size as usize {
            break;
        }
        batch_number += 1;
    }
    Ok(removed_total)
}

/// Decode the file and thumbnail refs of a chunk into storage paths.
///
/// An undecodable ref is logged and skipped: its blob is unreachable under
/// any name we could derive, and keeping the row would wedge the queue.
fn blob_paths(records: &[DeletionRecord]) -> Vec<String> {
    let mut paths = Vec::with_capacity(records.len() * 2);
    for record in records {
        for file_ref in [&record.file_id, &record.thumbnail_id].into_iter().flatten() {
            match decode_blob_ref(file_ref) {
                Ok(path) if !path.is_empty() => paths.push(path),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(id = record.id, error = %e, "Skipping undecodable blob ref");
                }
            }
        }
    }
    paths
}
