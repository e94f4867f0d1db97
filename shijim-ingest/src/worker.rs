//! Long-running buffering/flush task, grounded on
//! `examples/original_source/shijim/recorder/ingestion.py`'s
//! `IngestionWorker`: subscribe wildcard-with-timeout, buffer ticks and
//! books, flush on size/interval/stop, fan out to writers in parallel.
//!
//! The Python version runs its inner pull loop and its writer fan-out on
//! the same thread (a small thread pool for the fan-out only); the bus's
//! subscription here is a blocking, `Condvar`-based iterator, so this
//! version bridges it to async land with a dedicated OS thread feeding a
//! bounded `tokio::sync::mpsc` channel, and does the fan-out with
//! `tokio::task::JoinSet`.

use crate::error::WriterError;
use async_trait::async_trait;
use shijim_bus::{EventBus, Topic};
use shijim_core::event::{MDBookEvent, MDTickEvent, MarketDataEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Per-kind batch sink. Implemented for `Arc<RawWriter>` and
/// `Arc<ColumnarWriter>` rather than the bare types, since `write_batch`
/// needs an owned, cloneable handle to move into `spawn_blocking`/async
/// tasks. Store entries for [`IngestionWorker::new`] as
/// `Arc::new(Arc::new(RawWriter::new(..))) as Arc<dyn Writer>` — the
/// outer `Arc` is the trait object pointer, the inner one is what these
/// impls clone per call.
#[async_trait]
pub trait Writer: Send + Sync {
    async fn write_batch(&self, ticks: Vec<MDTickEvent>, books: Vec<MDBookEvent>) -> Result<(), WriterError>;
    async fn flush(&self, force: bool) -> Result<(), WriterError>;
}

#[async_trait]
impl Writer for Arc<crate::raw_writer::RawWriter> {
    async fn write_batch(&self, ticks: Vec<MDTickEvent>, books: Vec<MDBookEvent>) -> Result<(), WriterError> {
        let writer = Arc::clone(self);
        tokio::task::spawn_blocking(move || writer.write_batch(&ticks, &books))
            .await
            .map_err(|e| WriterError::TaskJoin(e.to_string()))?
    }

    async fn flush(&self, _force: bool) -> Result<(), WriterError> {
        Ok(())
    }
}

#[async_trait]
impl Writer for Arc<crate::columnar_writer::ColumnarWriter> {
    async fn write_batch(&self, ticks: Vec<MDTickEvent>, books: Vec<MDBookEvent>) -> Result<(), WriterError> {
        crate::columnar_writer::ColumnarWriter::write_batch(self, &ticks, &books).await
    }

    async fn flush(&self, force: bool) -> Result<(), WriterError> {
        crate::columnar_writer::ColumnarWriter::flush(self, force).await
    }
}

/// Flush-trigger and batching thresholds (spec §4.2).
#[derive(Debug, Clone, Copy)]
pub struct IngestionConfig {
    pub max_buffer_events: usize,
    pub flush_interval: Duration,
    pub max_batch_events: usize,
    pub max_batch_wait: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_buffer_events: 1000,
            flush_interval: Duration::from_secs(1),
            max_batch_events: 512,
            max_batch_wait: Duration::from_millis(10),
        }
    }
}

/// A cloneable handle to request an idempotent stop.
#[derive(Clone, Debug)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Long-running ingestion task.
pub struct IngestionWorker {
    config: IngestionConfig,
    writers: Vec<Arc<dyn Writer>>,
    stop: Arc<AtomicBool>,
}

impl std::fmt::Debug for IngestionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionWorker")
            .field("config", &self.config)
            .field("writer_count", &self.writers.len())
            .finish()
    }
}

impl IngestionWorker {
    pub fn new(writers: Vec<Arc<dyn Writer>>, config: IngestionConfig) -> (Self, StopHandle) {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = StopHandle(Arc::clone(&stop));
        (Self { config, writers, stop }, handle)
    }

    /// Subscribe to the bus's wildcard topic and run until stopped.
    /// `B::Subscription` runs its blocking pull loop on a dedicated
    /// thread; this async loop only does buffering, flush timing, and
    /// fan-out.
    pub async fn run<B>(self, bus: B) -> Result<(), WriterError>
    where
        B: EventBus + Send + 'static,
        B::Subscription: Send + 'static,
    {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<Option<MarketDataEvent>>(self.config.max_batch_events * 2);
        let subscribe_timeout = self.config.max_batch_wait;
        std::thread::spawn(move || {
            let subscription = bus.subscribe(Topic::Wildcard, Some(subscribe_timeout));
            for item in subscription {
                if tx.blocking_send(item).is_err() {
                    break;
                }
            }
        });

        let mut tick_buffer = Vec::new();
        let mut book_buffer = Vec::new();
        let mut last_flush = Instant::now();

        loop {
            let inner_deadline = Instant::now() + self.config.max_batch_wait;
            let mut pulled = 0usize;
            let mut channel_closed = false;

            while pulled < self.config.max_batch_events {
                let remaining = inner_deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match tokio::time::timeout(remaining, rx.recv()).await {
                    Ok(Some(Some(event))) => {
                        match event {
                            MarketDataEvent::Tick(t) => tick_buffer.push(t),
                            MarketDataEvent::Book(b) => book_buffer.push(b),
                        }
                        pulled += 1;
                    }
                    Ok(Some(None)) => break, // heartbeat-null: stop the inner loop early
                    Ok(None) => {
                        channel_closed = true;
                        break;
                    }
                    Err(_elapsed) => break,
                }
            }

            if channel_closed {
                self.stop.store(true, Ordering::Relaxed);
            }

            let stopped = self.stop.load(Ordering::Relaxed);
            let should_flush = tick_buffer.len() + book_buffer.len() >= self.config.max_buffer_events
                || last_flush.elapsed() >= self.config.flush_interval
                || stopped;

            if should_flush {
                let ticks = std::mem::take(&mut tick_buffer);
                let books = std::mem::take(&mut book_buffer);
                last_flush = Instant::now();
                self.flush_to_writers(ticks, books).await?;
            }

            if stopped {
                break;
            }
        }

        Ok(())
    }

    async fn flush_to_writers(&self, ticks: Vec<MDTickEvent>, books: Vec<MDBookEvent>) -> Result<(), WriterError> {
        let mut set = JoinSet::new();
        for writer in &self.writers {
            let writer = Arc::clone(writer);
            let ticks = ticks.clone();
            let books = books.clone();
            set.spawn(async move {
                writer.write_batch(ticks, books).await?;
                writer.flush(true).await
            });
        }

        let mut first_err = None;
        while let Some(result) = set.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "writer flush failed");
                    first_err.get_or_insert(e);
                }
                Err(join_err) => {
                    tracing::warn!(error = %join_err, "writer task panicked");
                    first_err.get_or_insert(WriterError::TaskJoin(join_err.to_string()));
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_writer::RawWriter;
    use shijim_bus::QueueBus;
    use shijim_core::event::{AssetType, Side};
    use shijim_core::extras::Extras;
    use tempfile::tempdir;

    fn tick(ts_ns: i64) -> MDTickEvent {
        MDTickEvent::new(ts_ns, "2330", AssetType::Stock, "TSE", None, None, Side::None, None, None, Extras::new())
            .unwrap()
    }

    #[tokio::test]
    async fn flushes_on_stop_and_persists_events() {
        let dir = tempdir().unwrap();
        let raw_writer: Arc<dyn Writer> = Arc::new(Arc::new(RawWriter::new(dir.path())));
        let config = IngestionConfig {
            max_buffer_events: 1000,
            flush_interval: Duration::from_secs(60),
            max_batch_events: 512,
            max_batch_wait: Duration::from_millis(5),
        };
        let (worker, stop_handle) = IngestionWorker::new(vec![raw_writer], config);

        let bus = QueueBus::new(100);
        bus.publish(MarketDataEvent::from(tick(1)));
        bus.publish(MarketDataEvent::from(tick(2)));

        let handle = tokio::spawn(worker.run(bus));
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_handle.stop();
        handle.await.unwrap().unwrap();

        let (path, _) = RawWriter::new(dir.path()).current_file_info("2330", &shijim_core::calendar::trading_day(1));
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let handle_a = StopHandle(Arc::new(AtomicBool::new(false)));
        let handle_b = handle_a.clone();
        handle_a.stop();
        handle_b.stop();
        assert!(handle_a.is_stopped());
        assert!(handle_b.is_stopped());
    }
}
