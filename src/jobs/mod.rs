//! Cleanup jobs.
//!
//! Each job owns a worker loop and a cluster-wide lease name. Every
//! instance ticks every enabled job on its configured interval; the lease
//! decides which instance actually runs it that cycle. A failed run is
//! logged and retried on the next tick, never mid-cycle: every delete is
//! idempotent, so catching up is just running again.

pub mod clean_attachments;
pub mod clean_launches;
pub mod clean_logs;
pub mod clean_storage;
pub mod delete_expired_users;
pub mod events_retention;
pub mod notify_user_expiration;

mod worker;

#[cfg(test)]
pub(crate) mod fakes;

use std::sync::Arc;

pub use worker::start_job_worker;

use crate::{
    clients::{BlobError, BlobStore, ClientError, IndexClient, SearchEngineClient},
    db::{
        ActivityRepo, AttachmentRepo, DbError, DbPool, LaunchRepo, LogRepo, ProjectRepo, UserRepo,
    },
    events::MessageBus,
};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Blob storage error: {0}")]
    Blob(#[from] BlobError),
}

/// Everything a cleanup job touches: the repositories plus the
/// secondary-store clients that mirror the primary deletes.
#[derive(Clone)]
pub struct CleanerDeps {
    pub projects: Arc<dyn ProjectRepo>,
    pub launches: Arc<dyn LaunchRepo>,
    pub logs: Arc<dyn LogRepo>,
    pub attachments: Arc<dyn AttachmentRepo>,
    pub users: Arc<dyn UserRepo>,
    pub activity: Arc<dyn ActivityRepo>,
    pub index: Arc<dyn IndexClient>,
    pub search: Arc<dyn SearchEngineClient>,
    pub blobs: Arc<dyn BlobStore>,
    pub bus: Arc<dyn MessageBus>,
}

impl CleanerDeps {
    pub fn new(
        db: &DbPool,
        index: Arc<dyn IndexClient>,
        search: Arc<dyn SearchEngineClient>,
        blobs: Arc<dyn BlobStore>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self {
            projects: db.projects(),
            launches: db.launches(),
            logs: db.logs(),
            attachments: db.attachments(),
            users: db.users(),
            activity: db.activity(),
            index,
            search,
            blobs,
            bus,
        }
    }
}
