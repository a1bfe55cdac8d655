//! Log ingestion: broker queue → batch accumulator → search engine.
//!
//! Raw log messages are pulled off a broker queue, buffered in a
//! [`BatchAccumulator`] and bulk-saved to the search engine. Unparsable
//! payloads are logged and dropped; a save failure drops the batch (the
//! search index is a secondary store, the logs still live in Postgres).

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    batch::{BatchAccumulator, BatchConfig, BatchSink, SinkError},
    clients::{BrokerClient, ClientError, SearchEngineClient},
    config::LogBatchConfig,
    models::LogMessage,
};

/// [`BatchSink`] bulk-saving log batches to the search engine.
struct SearchEngineSink {
    search: Arc<dyn SearchEngineClient>,
}

#[async_trait]
impl BatchSink<LogMessage> for SearchEngineSink {
    async fn consume(&self, batch: Vec<LogMessage>) -> Result<(), SinkError> {
        self.search.save(&batch).await?;
        Ok(())
    }
}

/// Batching front of the log-ingestion path.
pub struct LogPipeline {
    accumulator: Arc<BatchAccumulator<LogMessage>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl LogPipeline {
    /// Build the pipeline and start its flush timer.
    pub fn start(config: &LogBatchConfig, search: Arc<dyn SearchEngineClient>) -> Self {
        let accumulator = Arc::new(BatchAccumulator::new(
            BatchConfig {
                max_size: config.max_batch_size,
                flush_interval: config.timeout(),
            },
            Arc::new(SearchEngineSink { search }),
        ));
        let timer = accumulator.start_timer();
        Self {
            accumulator,
            timer: Mutex::new(Some(timer)),
        }
    }

    pub async fn submit(&self, message: LogMessage) {
        self.accumulator.add(message).await;
    }

    /// Flush buffered messages and stop the timer.
    pub async fn shutdown(&self) {
        self.accumulator.shutdown().await;
        let timer = self.timer.lock().take();
        if let Some(timer) = timer {
            if let Err(e) = timer.await {
                warn!(error = %e, "Log flush timer task failed");
            }
        }
    }
}

/// Starts the log-ingestion worker as a background task.
///
/// Polls the configured broker queue and feeds the pipeline. Runs
/// indefinitely until the task is cancelled; poll errors are logged and
/// retried after the poll interval.
pub async fn start_log_ingest_worker(
    broker: Arc<BrokerClient>,
    pipeline: Arc<LogPipeline>,
    config: LogBatchConfig,
) {
    tracing::info!(
        queue = %config.queue,
        max_batch_size = config.max_batch_size,
        max_batch_timeout_ms = config.max_batch_timeout_ms,
        "Starting log ingestion worker"
    );

    loop {
        match drain_queue_once(&broker, &pipeline, &config).await {
            // A full poll means more may be waiting; go straight back.
            Ok(accepted) if accepted == config.poll_count as usize => continue,
            Ok(accepted) => {
                if accepted > 0 {
                    debug!(accepted, queue = %config.queue, "Drained log queue");
                }
            }
            Err(e) => {
                warn!(error = %e, queue = %config.queue, "Log queue poll failed");
            }
        }
        tokio::time::sleep(config.poll_interval()).await;
    }
}

/// Pull one batch of messages off the queue into the pipeline.
///
/// Returns the number of messages pulled, parsed or not. Messages that do
/// not parse as [`LogMessage`] are logged and dropped.
pub async fn drain_queue_once(
    broker: &BrokerClient,
    pipeline: &LogPipeline,
    config: &LogBatchConfig,
) -> Result<usize, ClientError> {
    let messages = broker.get_messages(&config.queue, config.poll_count).await?;
    let pulled = messages.len();

    for message in messages {
        match serde_json::from_str::<LogMessage>(&message.payload) {
            Ok(log) => pipeline.submit(log).await,
            Err(e) => {
                warn!(
                    error = %e,
                    routing_key = %message.routing_key,
                    "Dropping unparsable log message"
                );
            }
        }
    }
    Ok(pulled)
}
