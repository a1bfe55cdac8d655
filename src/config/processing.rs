use serde::{Deserialize, Serialize};

/// Log-ingestion batching settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessingConfig {
    #[serde(default)]
    pub logs: LogBatchConfig,
}

/// Batching parameters for the log ingestion pipeline.
///
/// A batch is flushed when it reaches `max_batch_size` entries or when
/// `max_batch_timeout_ms` elapses since the last flush, whichever comes
/// first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogBatchConfig {
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_max_batch_timeout_ms")]
    pub max_batch_timeout_ms: u64,

    /// Broker queue the raw log messages arrive on.
    #[serde(default = "default_logs_queue")]
    pub queue: String,

    /// How many messages to pull from the queue per poll.
    #[serde(default = "default_poll_count")]
    pub poll_count: u32,

    /// Delay between polls when the queue was empty or errored.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl LogBatchConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.max_batch_timeout_ms)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for LogBatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_batch_timeout_ms: default_max_batch_timeout_ms(),
            queue: default_logs_queue(),
            poll_count: default_poll_count(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_max_batch_size() -> usize {
    1000
}

fn default_max_batch_timeout_ms() -> u64 {
    5000
}

fn default_logs_queue() -> String {
    "log_messages".into()
}

fn default_poll_count() -> u32 {
    100
}

fn default_poll_interval_ms() -> u64 {
    1000
}
