//! Cleanup job scheduling and retention settings.
//!
//! Each job gets its own section with an `enabled` switch, a trigger
//! interval, and a `lock_at_most_secs` ceiling for the cluster-wide lease.
//! The lease ceiling bounds how long a crashed holder can block the next
//! run; deletes are idempotent, so the safety ceiling is generous (24h).
//!
//! # Example
//!
//! ```toml
//! [jobs.clean_storage]
//! interval_secs = 1800
//! chunk_size = 50000
//!
//! [jobs.delete_expired_users]
//! retention_days = 180
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Cap on a single storage-sweep chunk, bounding the number of tombstone
/// rows touched in one pass regardless of configuration.
pub const MAX_STORAGE_CHUNK: u32 = 200_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    /// Launch reclamation (`job.keepLaunches` attribute).
    #[serde(default = "JobSchedule::hourly")]
    pub clean_launches: JobSchedule,

    /// Log reclamation (`job.keepLogs` attribute).
    #[serde(default = "JobSchedule::hourly")]
    pub clean_logs: JobSchedule,

    /// Attachment-to-tombstone reclamation (`job.keepScreenshots`).
    #[serde(default = "JobSchedule::hourly")]
    pub clean_attachments: JobSchedule,

    /// Physical blob deletion of tombstoned attachments.
    #[serde(default)]
    pub clean_storage: CleanStorageConfig,

    /// Stale user and personal-project reclamation.
    #[serde(default)]
    pub delete_expired_users: RetentionJobConfig,

    /// Expiration warning emails. Shares `delete_expired_users`'
    /// retention window; only the trigger is scheduled separately.
    #[serde(default = "JobSchedule::daily")]
    pub notify_user_expiration: JobSchedule,

    /// Audit/activity event reclamation.
    #[serde(default)]
    pub events_retention: RetentionJobConfig,

    /// Safety settings shared by all destructive jobs.
    #[serde(default)]
    pub safety: JobSafety,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            clean_launches: JobSchedule::hourly(),
            clean_logs: JobSchedule::hourly(),
            clean_attachments: JobSchedule::hourly(),
            clean_storage: CleanStorageConfig::default(),
            delete_expired_users: RetentionJobConfig::default(),
            notify_user_expiration: JobSchedule::daily(),
            events_retention: RetentionJobConfig::default(),
            safety: JobSafety::default(),
        }
    }
}

impl JobsConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.clean_storage.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "jobs.clean_storage.chunk_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Trigger interval and lease ceiling for one job.
///
/// No `deny_unknown_fields` here: this struct is flattened into the
/// storage and retention job sections, and serde does not support the
/// combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSchedule {
    /// Whether the job runs at all on this instance.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between trigger ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Maximum lease hold; a crashed run frees the job name after this.
    #[serde(default = "default_lock_at_most_secs")]
    pub lock_at_most_secs: u64,
}

impl JobSchedule {
    pub fn hourly() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            lock_at_most_secs: default_lock_at_most_secs(),
        }
    }

    pub fn daily() -> Self {
        Self {
            enabled: true,
            interval_secs: 24 * 3600,
            lock_at_most_secs: default_lock_at_most_secs(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_hold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lock_at_most_secs as i64)
    }
}

impl Default for JobSchedule {
    fn default() -> Self {
        Self::hourly()
    }
}

/// Storage sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanStorageConfig {
    #[serde(flatten)]
    pub schedule: JobSchedule,

    /// Per-run budget of tombstone rows to drain. Each database round trip
    /// touches at most `MAX_STORAGE_CHUNK` rows.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
}

impl CleanStorageConfig {
    /// Rows per database round trip: the configured chunk, capped.
    pub fn batch_size(&self) -> u32 {
        self.chunk_size.min(MAX_STORAGE_CHUNK)
    }
}

impl Default for CleanStorageConfig {
    fn default() -> Self {
        Self {
            schedule: JobSchedule::hourly(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Schedule plus a flat retention window in days. The job is skipped when
/// the window is absent or not positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionJobConfig {
    #[serde(flatten)]
    pub schedule: JobSchedule,

    /// Retention window in days; unset disables the job.
    #[serde(default)]
    pub retention_days: Option<i64>,
}

impl Default for RetentionJobConfig {
    fn default() -> Self {
        Self {
            schedule: JobSchedule::hourly(),
            retention_days: None,
        }
    }
}

/// Safety settings shared by the destructive jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSafety {
    /// Log what would be deleted without deleting. Useful for trialling
    /// retention attributes before enabling them for real.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_lock_at_most_secs() -> u64 {
    24 * 3600
}

fn default_chunk_size() -> u32 {
    50_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = JobsConfig::default();
        assert!(config.clean_launches.enabled);
        assert_eq!(config.clean_launches.interval_secs, 3600);
        assert_eq!(config.clean_launches.lock_at_most_secs, 24 * 3600);
        assert_eq!(config.clean_storage.chunk_size, 50_000);
        assert!(config.delete_expired_users.retention_days.is_none());
        assert_eq!(config.notify_user_expiration.interval_secs, 24 * 3600);
        assert!(!config.safety.dry_run);
    }

    #[test]
    fn chunk_size_is_capped() {
        let config: CleanStorageConfig = toml::from_str("chunk_size = 1000000").unwrap();
        assert_eq!(config.chunk_size, 1_000_000);
        assert_eq!(config.batch_size(), MAX_STORAGE_CHUNK);
    }

    #[test]
    fn flattened_schedule_parses() {
        let config: CleanStorageConfig =
            toml::from_str("interval_secs = 60\nchunk_size = 10").unwrap();
        assert_eq!(config.schedule.interval_secs, 60);
        assert_eq!(config.batch_size(), 10);
    }

    #[test]
    fn retention_job_disabled_by_default() {
        let config: RetentionJobConfig = toml::from_str("").unwrap();
        assert!(config.retention_days.is_none());
        assert!(config.schedule.enabled);
    }
}
