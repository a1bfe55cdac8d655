//! Generic batch accumulation for high-throughput ingestion.
//!
//! Entries are collected and handed to a sink in batches. A batch is
//! flushed when it reaches `max_size` entries or when `flush_interval`
//! elapses since the previous flush, whichever comes first. A
//! size-triggered flush restarts the interval timer, so a steady stream of
//! full batches never sees a timer flush in between.
//!
//! Every entry is delivered to the sink exactly once: the buffer swap
//! happens under the mutex, and the swapped-out batch is consumed outside
//! it so slow sinks never block producers.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer of accumulated batches.
#[async_trait]
pub trait BatchSink<T>: Send + Sync {
    async fn consume(&self, batch: Vec<T>) -> Result<(), SinkError>;
}

/// Configuration for a [`BatchAccumulator`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Flush as soon as this many entries are buffered.
    pub max_size: usize,
    /// Flush whatever is buffered once this long has passed since the last
    /// flush.
    pub flush_interval: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            flush_interval: Duration::from_secs(5),
        }
    }
}

/// Size- and time-triggered batch buffer in front of an async sink.
pub struct BatchAccumulator<T> {
    buffer: Mutex<Vec<T>>,
    config: BatchConfig,
    sink: Arc<dyn BatchSink<T>>,
    /// Signalled after a size-triggered flush so the timer restarts, and on
    /// shutdown so the timer task exits.
    timer_reset: Notify,
    shutting_down: AtomicBool,
}

impl<T: Send + 'static> BatchAccumulator<T> {
    pub fn new(config: BatchConfig, sink: Arc<dyn BatchSink<T>>) -> Self {
        let max_size = config.max_size;
        Self {
            buffer: Mutex::new(Vec::with_capacity(max_size)),
            config,
            sink,
            timer_reset: Notify::new(),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Add an entry, flushing the batch if it just reached `max_size`.
    pub async fn add(&self, entry: T) {
        let full_batch = {
            let mut buffer = self.buffer.lock();
            buffer.push(entry);
            if buffer.len() >= self.config.max_size {
                Some(std::mem::replace(
                    &mut *buffer,
                    Vec::with_capacity(self.config.max_size),
                ))
            } else {
                None
            }
        };

        if let Some(batch) = full_batch {
            self.flush_batch(batch).await;
            self.timer_reset.notify_waiters();
        }
    }

    /// Start the background timer that flushes partial batches.
    ///
    /// The task runs until [`BatchAccumulator::shutdown`] is called.
    pub fn start_timer(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let accumulator = Arc::clone(self);
        let flush_interval = self.config.flush_interval;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(flush_interval) => {
                        accumulator.flush_pending().await;
                    }
                    _ = accumulator.timer_reset.notified() => {
                        // A size-triggered flush restarted the clock, or we
                        // are shutting down.
                    }
                }
                if accumulator.shutting_down.load(Ordering::Acquire) {
                    tracing::debug!("Batch flush timer shutting down");
                    break;
                }
            }
        })
    }

    /// Flush remaining entries and stop the timer task.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        self.timer_reset.notify_waiters();
        self.flush_pending().await;
    }

    /// Number of currently buffered entries.
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    async fn flush_pending(&self) {
        let batch = {
            let mut buffer = self.buffer.lock();
            if buffer.is_empty() {
                return;
            }
            std::mem::replace(&mut *buffer, Vec::with_capacity(self.config.max_size))
        };
        self.flush_batch(batch).await;
    }

    async fn flush_batch(&self, batch: Vec<T>) {
        let count = batch.len();
        tracing::debug!(count, "Flushing batch");

        if let Err(e) = self.sink.consume(batch).await {
            tracing::error!(error = %e, count, "Batch flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex as SyncMutex;

    use super::*;

    struct RecordingSink {
        batches: SyncMutex<Vec<Vec<u64>>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                batches: SyncMutex::new(Vec::new()),
            })
        }

        fn batches(&self) -> Vec<Vec<u64>> {
            self.batches.lock().clone()
        }
    }

    #[async_trait]
    impl BatchSink<u64> for RecordingSink {
        async fn consume(&self, batch: Vec<u64>) -> Result<(), SinkError> {
            self.batches.lock().push(batch);
            Ok(())
        }
    }

    fn accumulator(
        max_size: usize,
        flush_interval: Duration,
        sink: Arc<RecordingSink>,
    ) -> Arc<BatchAccumulator<u64>> {
        Arc::new(BatchAccumulator::new(
            BatchConfig {
                max_size,
                flush_interval,
            },
            sink,
        ))
    }

    #[tokio::test]
    async fn size_trigger_flushes_full_batch() {
        let sink = RecordingSink::new();
        let acc = accumulator(3, Duration::from_secs(3600), Arc::clone(&sink));

        for i in 0..3 {
            acc.add(i).await;
        }

        assert_eq!(sink.batches(), vec![vec![0, 1, 2]]);
        assert!(acc.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_flushes_partial_batch() {
        let sink = RecordingSink::new();
        let acc = accumulator(100, Duration::from_secs(5), Arc::clone(&sink));
        let timer = acc.start_timer();

        acc.add(1).await;
        acc.add(2).await;
        assert!(sink.batches().is_empty());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(sink.batches(), vec![vec![1, 2]]);

        acc.shutdown().await;
        timer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn size_flush_restarts_the_timer() {
        let sink = RecordingSink::new();
        let acc = accumulator(2, Duration::from_secs(10), Arc::clone(&sink));
        let timer = acc.start_timer();

        // Size-triggered flush at t=9, just before the timer would fire.
        tokio::time::sleep(Duration::from_secs(9)).await;
        acc.add(1).await;
        acc.add(2).await;
        assert_eq!(sink.batches().len(), 1);

        // The entry added right after must wait a full interval, not the
        // remainder of the old one.
        acc.add(3).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.batches().len(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(sink.batches().len(), 2);
        assert_eq!(sink.batches()[1], vec![3]);

        acc.shutdown().await;
        timer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn empty_timer_tick_does_not_call_sink() {
        let sink = RecordingSink::new();
        let acc = accumulator(10, Duration::from_secs(1), Arc::clone(&sink));
        let timer = acc.start_timer();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(sink.batches().is_empty());

        acc.shutdown().await;
        timer.await.unwrap();
        assert!(sink.batches().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drains_remaining_entries() {
        let sink = RecordingSink::new();
        let acc = accumulator(100, Duration::from_secs(3600), Arc::clone(&sink));
        let timer = acc.start_timer();

        acc.add(7).await;
        acc.add(8).await;
        acc.shutdown().await;
        timer.await.unwrap();

        assert_eq!(sink.batches(), vec![vec![7, 8]]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_deliver_every_entry_exactly_once() {
        let sink = RecordingSink::new();
        let acc = accumulator(16, Duration::from_secs(3600), Arc::clone(&sink));

        let mut handles = Vec::new();
        for task in 0..8u64 {
            let acc = Arc::clone(&acc);
            handles.push(tokio::spawn(async move {
                for i in 0..100u64 {
                    acc.add(task * 100 + i).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        acc.shutdown().await;

        let mut seen: Vec<u64> = sink.batches().into_iter().flatten().collect();
        seen.sort_unstable();
        let expected: Vec<u64> = (0..800).collect();
        assert_eq!(seen, expected);
    }
}
