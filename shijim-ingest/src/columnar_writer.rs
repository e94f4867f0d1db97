//! Batched columnar sink with retry/backoff/fallback, grounded on the
//! retry/backoff/fallback *control flow* exercised by
//! `examples/original_source/tests/recorder/test_clickhouse_writer_reliability.py`
//! and `test_clickhouse_writer_fallback.py` (the richer implementation
//! those tests exercise isn't itself in the filtered source — only the
//! stub `clickhouse_writer.py` is — so the tests are the authoritative
//! behavioral spec here). The concrete client (native binary protocol or
//! HTTP `JSONEachRow`) is abstracted behind [`ColumnarClient`] so this
//! writer stays store-agnostic.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shijim_core::calendar::trading_day;
use shijim_core::event::{MDBookEvent, MDTickEvent, Side};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::WriterError;

pub const FAILED_BATCH_HISTORY_LIMIT: usize = 32;

const DEFAULT_FLUSH_THRESHOLD: usize = 5000;
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);
const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;
const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(1);

/// Flattened tick row matching spec §4.4's row schema.
#[derive(Debug, Clone)]
pub struct TickRow {
    pub trading_day: String,
    pub ts_ns: i64,
    pub symbol: String,
    pub asset_type: String,
    pub exchange: String,
    pub price: Option<Decimal>,
    pub size: Option<i64>,
    pub side: Side,
    pub total_volume: Option<i64>,
    pub total_amount: Option<Decimal>,
    pub extras_json: String,
}

/// Flattened book row matching spec §4.4's row schema ("the book fields
/// in §3 with level arrays plus extras_as_json").
#[derive(Debug, Clone)]
pub struct BookRow {
    pub trading_day: String,
    pub ts_ns: i64,
    pub symbol: String,
    pub asset_type: String,
    pub exchange: String,
    pub price: Option<Decimal>,
    pub size: Option<i64>,
    pub side: Side,
    pub total_volume: Option<i64>,
    pub total_amount: Option<Decimal>,
    pub bid_prices: Vec<Decimal>,
    pub bid_volumes: Vec<i64>,
    pub ask_prices: Vec<Decimal>,
    pub ask_volumes: Vec<i64>,
    pub bid_total_vol: Option<i64>,
    pub ask_total_vol: Option<i64>,
    pub underlying_price: Option<Decimal>,
    pub extras_json: String,
}

fn asset_type_str(asset_type: shijim_core::event::AssetType) -> String {
    match asset_type {
        shijim_core::event::AssetType::Futures => "futures".to_string(),
        shijim_core::event::AssetType::Stock => "stock".to_string(),
    }
}

fn tick_row(event: &MDTickEvent) -> Result<TickRow, WriterError> {
    Ok(TickRow {
        trading_day: trading_day(event.ts_ns),
        ts_ns: event.ts_ns,
        symbol: event.symbol.clone(),
        asset_type: asset_type_str(event.asset_type),
        exchange: event.exchange.clone(),
        price: event.price,
        size: event.size,
        side: event.side,
        total_volume: event.total_volume,
        total_amount: event.total_amount,
        extras_json: serde_json::to_string(&event.extras)?,
    })
}

fn book_row(event: &MDBookEvent) -> Result<BookRow, WriterError> {
    Ok(BookRow {
        trading_day: trading_day(event.ts_ns),
        ts_ns: event.ts_ns,
        symbol: event.symbol.clone(),
        asset_type: asset_type_str(event.asset_type),
        exchange: event.exchange.clone(),
        price: event.price,
        size: event.size,
        side: event.side,
        total_volume: event.total_volume,
        total_amount: event.total_amount,
        bid_prices: event.bid_prices.clone(),
        bid_volumes: event.bid_volumes.clone(),
        ask_prices: event.ask_prices.clone(),
        ask_volumes: event.ask_volumes.clone(),
        bid_total_vol: event.bid_total_vol,
        ask_total_vol: event.ask_total_vol,
        underlying_price: event.underlying_price,
        extras_json: serde_json::to_string(&event.extras)?,
    })
}

/// Transport-agnostic insert surface a columnar store implements.
#[async_trait]
pub trait ColumnarClient: Send + Sync + std::fmt::Debug {
    async fn insert_ticks(&self, rows: &[TickRow]) -> Result<(), String>;
    async fn insert_books(&self, rows: &[BookRow]) -> Result<(), String>;
}

/// Observability state for the writer's retry/backoff behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnarWriterState {
    Healthy,
    RetryingBackoff,
    Fallback,
}

/// Summary of one failed flush attempt, for the bounded history.
#[derive(Debug, Clone)]
pub struct FailedBatchMeta {
    pub kind: &'static str,
    pub count: usize,
    pub error: String,
}

struct RetryState {
    consecutive_failures: AtomicU32,
    next_attempt_at: Mutex<Instant>,
}

/// Buffered columnar sink: accumulates tick/book rows and flushes them
/// in batches, falling back to JSONL on persistent failure.
pub struct ColumnarWriter {
    client: Box<dyn ColumnarClient>,
    fallback_dir: PathBuf,
    flush_threshold: usize,
    flush_interval: Duration,
    max_retries: u32,
    backoff_base: Duration,
    backoff_multiplier: u32,
    backoff_cap: Duration,
    tick_buffer: Mutex<Vec<MDTickEvent>>,
    book_buffer: Mutex<Vec<MDBookEvent>>,
    last_flush: Mutex<Instant>,
    retry: RetryState,
    failed_batch_history: Mutex<VecDeque<FailedBatchMeta>>,
}

impl std::fmt::Debug for ColumnarWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnarWriter")
            .field("flush_threshold", &self.flush_threshold)
            .field("state", &self.state())
            .finish()
    }
}

impl ColumnarWriter {
    pub fn new(client: Box<dyn ColumnarClient>, fallback_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            fallback_dir: fallback_dir.into(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            backoff_cap: DEFAULT_BACKOFF_CAP,
            tick_buffer: Mutex::new(Vec::new()),
            book_buffer: Mutex::new(Vec::new()),
            last_flush: Mutex::new(Instant::now()),
            retry: RetryState { consecutive_failures: AtomicU32::new(0), next_attempt_at: Mutex::new(Instant::now()) },
            failed_batch_history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold;
        self
    }

    /// Append events to the in-memory buffers, flushing immediately if
    /// the combined size crosses `flush_threshold` or the interval has
    /// elapsed (spec §4.4's "identical shape to §4.2").
    pub async fn write_batch(&self, ticks: &[MDTickEvent], books: &[MDBookEvent]) -> Result<(), WriterError> {
        {
            let mut tick_buf = self.tick_buffer.lock().unwrap_or_else(|e| e.into_inner());
            tick_buf.extend_from_slice(ticks);
            let mut book_buf = self.book_buffer.lock().unwrap_or_else(|e| e.into_inner());
            book_buf.extend_from_slice(books);

            let over_threshold = tick_buf.len() + book_buf.len() >= self.flush_threshold;
            drop(tick_buf);
            drop(book_buf);
            if over_threshold {
                return self.flush(false).await;
            }
        }
        let elapsed = self.last_flush.lock().unwrap_or_else(|e| e.into_inner()).elapsed();
        if elapsed >= self.flush_interval {
            return self.flush(false).await;
        }
        Ok(())
    }

    /// Current observability state.
    pub fn state(&self) -> ColumnarWriterState {
        let failures = self.retry.consecutive_failures.load(Ordering::Relaxed);
        if failures == 0 {
            ColumnarWriterState::Healthy
        } else if failures <= self.max_retries {
            ColumnarWriterState::RetryingBackoff
        } else {
            ColumnarWriterState::Fallback
        }
    }

    pub fn failed_batch_history(&self) -> Vec<FailedBatchMeta> {
        self.failed_batch_history.lock().unwrap_or_else(|e| e.into_inner()).iter().cloned().collect()
    }

    #[cfg(test)]
    fn tick_buffer_len(&self) -> usize {
        self.tick_buffer.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[cfg(test)]
    fn book_buffer_len(&self) -> usize {
        self.book_buffer.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Attempt one insert of each non-empty buffer. `force=true` (the
    /// worker's post-batch nudge, or an explicit caller request) bypasses
    /// the backoff gate; an automatic threshold/interval-triggered flush
    /// honors it. On success the corresponding buffer is cleared; on
    /// failure the buffer is left intact and the batch is persisted to
    /// the fallback directory (spec §4.4: "does NOT clear the in-memory
    /// buffer... every event in the failed batch is serialized to the
    /// fallback directory").
    pub async fn flush(&self, force: bool) -> Result<(), WriterError> {
        *self.last_flush.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();

        if !force {
            let next_attempt = *self.retry.next_attempt_at.lock().unwrap_or_else(|e| e.into_inner());
            if Instant::now() < next_attempt {
                return Ok(());
            }
        }

        let ticks: Vec<MDTickEvent> = self.tick_buffer.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if !ticks.is_empty() {
            self.flush_ticks(&ticks).await?;
        }

        let books: Vec<MDBookEvent> = self.book_buffer.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if !books.is_empty() {
            self.flush_books(&books).await?;
        }

        Ok(())
    }

    async fn flush_ticks(&self, ticks: &[MDTickEvent]) -> Result<(), WriterError> {
        let rows: Result<Vec<_>, _> = ticks.iter().map(tick_row).collect();
        let rows = rows?;
        match self.client.insert_ticks(&rows).await {
            Ok(()) => {
                self.tick_buffer.lock().unwrap_or_else(|e| e.into_inner()).clear();
                self.on_success();
                Ok(())
            }
            Err(message) => {
                self.on_failure("ticks", ticks.len(), &message);
                self.persist_fallback("ticks", ticks.iter().map(|t| t.ts_ns).next().unwrap_or(0), &rows_to_json(ticks)?)
            }
        }
    }

    async fn flush_books(&self, books: &[MDBookEvent]) -> Result<(), WriterError> {
        let rows: Result<Vec<_>, _> = books.iter().map(book_row).collect();
        let rows = rows?;
        match self.client.insert_books(&rows).await {
            Ok(()) => {
                self.book_buffer.lock().unwrap_or_else(|e| e.into_inner()).clear();
                self.on_success();
                Ok(())
            }
            Err(message) => {
                self.on_failure("books", books.len(), &message);
                self.persist_fallback("books", books.iter().map(|b| b.ts_ns).next().unwrap_or(0), &rows_to_json(books)?)
            }
        }
    }

    fn on_success(&self) {
        self.retry.consecutive_failures.store(0, Ordering::Relaxed);
    }

    fn on_failure(&self, kind: &'static str, count: usize, error: &str) {
        let failures = self.retry.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        let delay = self.backoff_base * self.backoff_multiplier.saturating_pow(failures.saturating_sub(1));
        let delay = delay.min(self.backoff_cap);
        *self.retry.next_attempt_at.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now() + delay;

        let mut history = self.failed_batch_history.lock().unwrap_or_else(|e| e.into_inner());
        if history.len() >= FAILED_BATCH_HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(FailedBatchMeta { kind, count, error: error.to_string() });
        tracing::warn!(kind, count, error, failures, "columnar writer flush failed");
    }

    fn persist_fallback(&self, kind: &str, sample_ts_ns: i64, lines: &[String]) -> Result<(), WriterError> {
        let day = trading_day(sample_ts_ns);
        let dir = self.fallback_dir.join(kind);
        std::fs::create_dir_all(&dir).map_err(|source| WriterError::Io { path: dir.display().to_string(), source })?;
        let path = dir.join(format!("{day}.jsonl"));
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| WriterError::Io { path: path.display().to_string(), source })?;
        use std::io::Write;
        for line in lines {
            writeln!(file, "{line}").map_err(|source| WriterError::Io { path: path.display().to_string(), source })?;
        }
        Ok(())
    }
}

fn rows_to_json<T: serde::Serialize>(events: &[T]) -> Result<Vec<String>, WriterError> {
    events.iter().map(|e| serde_json::to_string(e).map_err(WriterError::from)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shijim_core::event::AssetType;
    use shijim_core::extras::Extras;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    #[derive(Debug)]
    struct FlakyClient {
        fail_times: AtomicUsize,
    }

    impl FlakyClient {
        fn new(fail_times: usize) -> Self {
            Self { fail_times: AtomicUsize::new(fail_times) }
        }
    }

    #[async_trait]
    impl ColumnarClient for FlakyClient {
        async fn insert_ticks(&self, _rows: &[TickRow]) -> Result<(), String> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err("boom".to_string());
            }
            Ok(())
        }

        async fn insert_books(&self, _rows: &[BookRow]) -> Result<(), String> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err("boom".to_string());
            }
            Ok(())
        }
    }

    fn tick(ts_ns: i64) -> MDTickEvent {
        MDTickEvent::new(ts_ns, "TXF", AssetType::Futures, "TAIFEX", None, None, Side::None, None, None, Extras::new())
            .unwrap()
    }

    fn book(ts_ns: i64) -> MDBookEvent {
        MDBookEvent::new(
            ts_ns,
            "TXF",
            AssetType::Futures,
            "TAIFEX",
            None,
            None,
            Side::None,
            None,
            None,
            vec![],
            vec![],
            vec![],
            vec![],
            None,
            None,
            None,
            Extras::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn buffer_clears_only_after_success() {
        let dir = tempdir().unwrap();
        let client: Box<dyn ColumnarClient> = Box::new(FlakyClient::new(1));
        let writer = ColumnarWriter::new(client, dir.path());

        writer.write_batch(&[tick(1), tick(2)], &[]).await.unwrap();
        writer.flush(true).await.unwrap();
        assert_eq!(writer.tick_buffer_len(), 2);
        assert_eq!(writer.failed_batch_history().len(), 1);

        writer.flush(true).await.unwrap();
        assert_eq!(writer.tick_buffer_len(), 0);
        assert_eq!(writer.failed_batch_history().len(), 1);
    }

    #[tokio::test]
    async fn book_buffer_retries_until_success() {
        let dir = tempdir().unwrap();
        let client: Box<dyn ColumnarClient> = Box::new(FlakyClient::new(1));
        let writer = ColumnarWriter::new(client, dir.path());

        writer.write_batch(&[], &[book(1)]).await.unwrap();
        writer.flush(true).await.unwrap();
        assert_eq!(writer.book_buffer_len(), 1);
        assert_eq!(writer.failed_batch_history().last().unwrap().kind, "books");

        writer.flush(true).await.unwrap();
        assert_eq!(writer.book_buffer_len(), 0);
    }

    #[tokio::test]
    async fn permanent_failure_appends_one_fallback_entry_per_attempt() {
        let dir = tempdir().unwrap();
        let client: Box<dyn ColumnarClient> = Box::new(FlakyClient::new(10));
        let writer = ColumnarWriter::new(client, dir.path());

        writer.write_batch(&[tick(1)], &[]).await.unwrap();
        writer.flush(true).await.unwrap();
        writer.flush(true).await.unwrap();

        assert_eq!(writer.tick_buffer_len(), 1);
        assert_eq!(writer.failed_batch_history().len(), 2);
        let fallback_file = dir.path().join("ticks").join(format!("{}.jsonl", trading_day(1)));
        let contents = std::fs::read_to_string(fallback_file).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn failed_batch_history_is_bounded() {
        let dir = tempdir().unwrap();
        let failures = FAILED_BATCH_HISTORY_LIMIT + 5;
        let client: Box<dyn ColumnarClient> = Box::new(FlakyClient::new(failures));
        let writer = ColumnarWriter::new(client, dir.path());

        for i in 0..failures {
            writer.write_batch(&[tick(i as i64)], &[]).await.unwrap();
            writer.flush(true).await.unwrap();
        }

        assert_eq!(writer.failed_batch_history().len(), FAILED_BATCH_HISTORY_LIMIT);
    }

    #[tokio::test]
    async fn state_transitions_healthy_to_retrying_to_fallback() {
        let dir = tempdir().unwrap();
        let client: Box<dyn ColumnarClient> = Box::new(FlakyClient::new(10));
        let writer = ColumnarWriter::new(client, dir.path());
        assert_eq!(writer.state(), ColumnarWriterState::Healthy);

        writer.write_batch(&[tick(1)], &[]).await.unwrap();
        writer.flush(true).await.unwrap();
        assert_eq!(writer.state(), ColumnarWriterState::RetryingBackoff);

        for _ in 0..5 {
            writer.flush(true).await.unwrap();
        }
        assert_eq!(writer.state(), ColumnarWriterState::Fallback);
    }

    #[tokio::test]
    async fn non_forced_flush_is_gated_by_backoff_after_a_failure() {
        let dir = tempdir().unwrap();
        let client: Box<dyn ColumnarClient> = Box::new(FlakyClient::new(1));
        let writer = ColumnarWriter::new(client, dir.path()).with_flush_threshold(1);

        writer.write_batch(&[tick(1)], &[]).await.unwrap();
        // The threshold-triggered flush inside write_batch already consumed
        // the one scheduled failure; buffer should still hold the tick and
        // the writer should now be in backoff.
        assert_eq!(writer.tick_buffer_len(), 1);
        assert_eq!(writer.state(), ColumnarWriterState::RetryingBackoff);

        // An automatic (non-forced) retry immediately after should be
        // gated by backoff and therefore not clear the buffer yet, even
        // though the underlying client would now succeed.
        writer.flush(false).await.unwrap();
        assert_eq!(writer.tick_buffer_len(), 1);
    }
}
