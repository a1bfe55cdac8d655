//! In-memory fakes shared by the job tests.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    clients::{BlobError, BlobStore, ClientError, IndexClient, SearchEngineClient},
    db::{
        ActivityRepo, AttachmentRepo, AttributeValue, DbResult, LaunchRepo, LogRepo, ProjectRepo,
        UserRepo,
    },
    events::{ActivityEvent, MessageBus},
    jobs::CleanerDeps,
    models::{DeletionRecord, EmailNotificationRequest, ExpiredUser, ExpiringUser, LogMessage},
};

#[derive(Default)]
pub(crate) struct FakeProjectRepo {
    pub attributes: Mutex<HashMap<String, Vec<AttributeValue>>>,
    pub non_personal: Mutex<Vec<i64>>,
    pub deleted: Mutex<Vec<i64>>,
    pub issue_types_deleted_for: Mutex<Vec<i64>>,
}

impl FakeProjectRepo {
    pub fn with_attribute(self, attribute: &str, project_id: i64, value: Option<&str>) -> Self {
        self.attributes.lock().entry(attribute.to_string()).or_default().push(AttributeValue {
            project_id,
            value: value.map(String::from),
        });
        self
    }
}

#[async_trait]
impl ProjectRepo for FakeProjectRepo {
    async fn attribute_values(&self, attribute: &str) -> DbResult<Vec<AttributeValue>> {
        Ok(self.attributes.lock().get(attribute).cloned().unwrap_or_default())
    }

    async fn delete_by_ids(&self, project_ids: &[i64]) -> DbResult<u64> {
        self.deleted.lock().extend_from_slice(project_ids);
        Ok(project_ids.len() as u64)
    }

    async fn delete_custom_issue_types(&self, project_ids: &[i64]) -> DbResult<u64> {
        self.issue_types_deleted_for.lock().extend_from_slice(project_ids);
        Ok(project_ids.len() as u64)
    }

    async fn non_personal_project_ids(&self, _user_ids: &[i64]) -> DbResult<Vec<i64>> {
        Ok(self.non_personal.lock().clone())
    }
}

/// Launches keyed by project; a deleted launch disappears, so a re-run
/// selects nothing.
#[derive(Default)]
pub(crate) struct FakeLaunchRepo {
    pub launches: Mutex<HashMap<i64, Vec<(i64, DateTime<Utc>)>>>,
    pub clusters_deleted_for: Mutex<Vec<i64>>,
}

impl FakeLaunchRepo {
    pub fn with_launch(self, project_id: i64, launch_id: i64, start_time: DateTime<Utc>) -> Self {
        self.launches.lock().entry(project_id).or_default().push((launch_id, start_time));
        self
    }

    pub fn remaining(&self, project_id: i64) -> Vec<i64> {
        self.launches
            .lock()
            .get(&project_id)
            .map(|ls| ls.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LaunchRepo for FakeLaunchRepo {
    async fn expired_ids(&self, project_id: i64, cutoff: DateTime<Utc>) -> DbResult<Vec<i64>> {
        Ok(self
            .launches
            .lock()
            .get(&project_id)
            .map(|ls| {
                ls.iter().filter(|(_, start)| *start <= cutoff).map(|(id, _)| *id).collect()
            })
            .unwrap_or_default())
    }

    async fn delete_clusters(&self, launch_ids: &[i64]) -> DbResult<u64> {
        self.clusters_deleted_for.lock().extend_from_slice(launch_ids);
        Ok(launch_ids.len() as u64)
    }

    async fn delete_by_ids(&self, launch_ids: &[i64]) -> DbResult<u64> {
        let mut launches = self.launches.lock();
        let mut deleted = 0;
        for ls in launches.values_mut() {
            let before = ls.len();
            ls.retain(|(id, _)| !launch_ids.contains(id));
            deleted += (before - ls.len()) as u64;
        }
        Ok(deleted)
    }
}

/// Logs keyed by project; deletion drains them, so a re-run deletes zero.
/// The flag marks whether the log's effective launch resolves; orphans
/// survive every cleanup pass, like rows the real query cannot join to a
/// launch.
#[derive(Default)]
pub(crate) struct FakeLogRepo {
    pub logs: Mutex<HashMap<i64, Vec<(i64, DateTime<Utc>, bool)>>>,
}

impl FakeLogRepo {
    pub fn with_log(self, project_id: i64, log_id: i64, log_time: DateTime<Utc>) -> Self {
        self.logs.lock().entry(project_id).or_default().push((log_id, log_time, true));
        self
    }

    pub fn with_orphan_log(self, project_id: i64, log_id: i64, log_time: DateTime<Utc>) -> Self {
        self.logs.lock().entry(project_id).or_default().push((log_id, log_time, false));
        self
    }
}

#[async_trait]
impl LogRepo for FakeLogRepo {
    async fn delete_expired(&self, project_id: i64, cutoff: DateTime<Utc>) -> DbResult<Vec<i64>> {
        let mut logs = self.logs.lock();
        let Some(rows) = logs.get_mut(&project_id) else {
            return Ok(Vec::new());
        };
        let (expired, kept): (Vec<_>, Vec<_>) =
            rows.drain(..).partition(|(_, t, resolved)| *resolved && *t <= cutoff);
        *rows = kept;
        Ok(expired.into_iter().map(|(id, _, _)| id).collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeAttachmentRepo {
    pub moved_for_project: Mutex<HashMap<i64, u64>>,
    pub moved_by_project_ids: Mutex<Vec<i64>>,
    pub tombstones: Mutex<Vec<DeletionRecord>>,
}

impl FakeAttachmentRepo {
    pub fn with_expired(self, project_id: i64, count: u64) -> Self {
        self.moved_for_project.lock().insert(project_id, count);
        self
    }

    pub fn with_tombstone(self, id: i64, file_id: Option<&str>, thumbnail_id: Option<&str>) -> Self {
        self.tombstones.lock().push(DeletionRecord {
            id,
            file_id: file_id.map(String::from),
            thumbnail_id: thumbnail_id.map(String::from),
            creation_attachment_date: None,
            deletion_date: Utc::now(),
        });
        self
    }

    pub fn tombstone_ids(&self) -> Vec<i64> {
        self.tombstones.lock().iter().map(|r| r.id).collect()
    }
}

#[async_trait]
impl AttachmentRepo for FakeAttachmentRepo {
    async fn move_expired_to_deletion(
        &self,
        project_id: i64,
        _cutoff: DateTime<Utc>,
    ) -> DbResult<u64> {
        // One-shot: a second run finds nothing eligible.
        Ok(self.moved_for_project.lock().remove(&project_id).unwrap_or(0))
    }

    async fn move_by_project_ids(&self, project_ids: &[i64]) -> DbResult<u64> {
        self.moved_by_project_ids.lock().extend_from_slice(project_ids);
        Ok(project_ids.len() as u64)
    }

    async fn peek_deletion_chunk(&self, limit: u32) -> DbResult<Vec<DeletionRecord>> {
        Ok(self.tombstones.lock().iter().take(limit as usize).cloned().collect())
    }

    async fn remove_deletion_records(&self, ids: &[i64]) -> DbResult<u64> {
        let mut tombstones = self.tombstones.lock();
        let before = tombstones.len();
        tombstones.retain(|r| !ids.contains(&r.id));
        Ok((before - tombstones.len()) as u64)
    }
}

/// Expired users; deleting removes their rows, so a re-run finds none.
/// `inactivity` carries (email, days-inactive) pairs for the expiration
/// warning query.
#[derive(Default)]
pub(crate) struct FakeUserRepo {
    pub expired: Mutex<Vec<ExpiredUser>>,
    pub inactivity: Mutex<Vec<(String, i64)>>,
    pub avatar_refs: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<i64>>,
}

impl FakeUserRepo {
    pub fn with_expired(self, user_id: i64, personal_project_id: Option<i64>, email: &str) -> Self {
        self.expired.lock().push(ExpiredUser {
            user_id,
            personal_project_id,
            email: email.to_string(),
        });
        self
    }

    pub fn with_inactivity(self, email: &str, days: i64) -> Self {
        self.inactivity.lock().push((email.to_string(), days));
        self
    }
}

#[async_trait]
impl UserRepo for FakeUserRepo {
    async fn find_expired(&self, _cutoff: DateTime<Utc>) -> DbResult<Vec<ExpiredUser>> {
        Ok(self.expired.lock().clone())
    }

    async fn find_expiring(
        &self,
        retention_days: i64,
        thresholds: &[i64],
    ) -> DbResult<Vec<ExpiringUser>> {
        Ok(self
            .inactivity
            .lock()
            .iter()
            .filter(|(_, days)| thresholds.contains(&(retention_days - days)))
            .map(|(email, days)| ExpiringUser {
                email: email.clone(),
                inactivity_days: *days,
                remaining_days: retention_days - days,
            })
            .collect())
    }

    async fn avatar_refs(&self, _user_ids: &[i64]) -> DbResult<Vec<String>> {
        Ok(self.avatar_refs.lock().clone())
    }

    async fn delete_by_ids(&self, user_ids: &[i64]) -> DbResult<u64> {
        self.deleted.lock().extend_from_slice(user_ids);
        let mut expired = self.expired.lock();
        let users_before: Vec<i64> = distinct_users(&expired);
        expired.retain(|u| !user_ids.contains(&u.user_id));
        let users_after: Vec<i64> = distinct_users(&expired);
        Ok((users_before.len() - users_after.len()) as u64)
    }
}

fn distinct_users(rows: &[ExpiredUser]) -> Vec<i64> {
    let mut ids: Vec<i64> = rows.iter().map(|u| u.user_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[derive(Default)]
pub(crate) struct FakeActivityRepo {
    pub rows: Mutex<Vec<DateTime<Utc>>>,
}

impl FakeActivityRepo {
    pub fn with_row(self, created_at: DateTime<Utc>) -> Self {
        self.rows.lock().push(created_at);
        self
    }
}

#[async_trait]
impl ActivityRepo for FakeActivityRepo {
    async fn delete_before(&self, cutoff: DateTime<Utc>, _batch_size: u32) -> DbResult<u64> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|created_at| *created_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum IndexCall {
    Clean(i64, Vec<i64>),
    RemoveByLogDate(i64),
    RemoveByLaunchDate(i64),
    DeleteIndex(i64),
    RemoveSuggest(i64),
}

#[derive(Default)]
pub(crate) struct RecordingIndexClient {
    pub calls: Mutex<Vec<IndexCall>>,
}

impl RecordingIndexClient {
    pub fn calls(&self) -> Vec<IndexCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl IndexClient for RecordingIndexClient {
    async fn clean_index(&self, project_id: i64, ids: &[i64]) -> Result<u64, ClientError> {
        self.calls.lock().push(IndexCall::Clean(project_id, ids.to_vec()));
        Ok(ids.len() as u64)
    }

    async fn remove_from_index_less_than_log_date(
        &self,
        project_id: i64,
        _cutoff: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        self.calls.lock().push(IndexCall::RemoveByLogDate(project_id));
        Ok(())
    }

    async fn remove_from_index_less_than_launch_date(
        &self,
        project_id: i64,
        _cutoff: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        self.calls.lock().push(IndexCall::RemoveByLaunchDate(project_id));
        Ok(())
    }

    async fn delete_index(&self, project_id: i64) -> Result<(), ClientError> {
        self.calls.lock().push(IndexCall::DeleteIndex(project_id));
        Ok(())
    }

    async fn remove_suggest(&self, project_id: i64) -> Result<(), ClientError> {
        self.calls.lock().push(IndexCall::RemoveSuggest(project_id));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingSearchClient {
    pub deletes: Mutex<Vec<(i64, i64)>>,
}

#[async_trait]
impl SearchEngineClient for RecordingSearchClient {
    async fn save(&self, _logs: &[LogMessage]) -> Result<(), ClientError> {
        Ok(())
    }

    async fn delete_logs_by_launch_and_project(&self, launch_id: i64, project_id: i64) {
        self.deletes.lock().push((launch_id, project_id));
    }
}

/// Blob store remembering every deleted path. Unknown paths succeed, the
/// same soft not-found semantics as the real store. `fail` makes every
/// delete error to exercise the leave-in-place paths.
#[derive(Default)]
pub(crate) struct FakeBlobStore {
    pub deleted: Mutex<Vec<String>>,
    pub fail: bool,
}

impl FakeBlobStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn delete_all(&self, paths: &[String]) -> Result<(), BlobError> {
        if self.fail {
            return Err(BlobError::InvalidRef("storage unavailable".into()));
        }
        self.deleted.lock().extend_from_slice(paths);
        Ok(())
    }

    async fn delete_container(&self, name: &str) -> Result<(), BlobError> {
        if self.fail {
            return Err(BlobError::InvalidRef("storage unavailable".into()));
        }
        self.deleted.lock().push(name.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingBus {
    pub activities: Mutex<Vec<ActivityEvent>>,
    pub emails: Mutex<Vec<EmailNotificationRequest>>,
}

impl RecordingBus {
    pub fn activities(&self) -> Vec<ActivityEvent> {
        self.activities.lock().clone()
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn publish_activity(&self, event: ActivityEvent) {
        self.activities.lock().push(event);
    }

    async fn publish_email_notifications(&self, notifications: &[EmailNotificationRequest]) {
        self.emails.lock().extend_from_slice(notifications);
    }
}

/// All fakes bundled, convertible into [`CleanerDeps`].
#[derive(Default)]
pub(crate) struct FakeDeps {
    pub projects: Arc<FakeProjectRepo>,
    pub launches: Arc<FakeLaunchRepo>,
    pub logs: Arc<FakeLogRepo>,
    pub attachments: Arc<FakeAttachmentRepo>,
    pub users: Arc<FakeUserRepo>,
    pub activity: Arc<FakeActivityRepo>,
    pub index: Arc<RecordingIndexClient>,
    pub search: Arc<RecordingSearchClient>,
    pub blobs: Arc<FakeBlobStore>,
    pub bus: Arc<RecordingBus>,
}

impl FakeDeps {
    pub fn deps(&self) -> CleanerDeps {
        CleanerDeps {
            projects: self.projects.clone(),
            launches: self.launches.clone(),
            logs: self.logs.clone(),
            attachments: self.attachments.clone(),
            users: self.users.clone(),
            activity: self.activity.clone(),
            index: self.index.clone(),
            search: self.search.clone(),
            blobs: self.blobs.clone(),
            bus: self.bus.clone(),
        }
    }
}
