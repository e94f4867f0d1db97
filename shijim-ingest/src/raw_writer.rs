//! Append-only, trading-day/symbol-partitioned JSONL log.
//!
//! Grounded on `examples/original_source/shijim/recorder/raw_writer.py`'s
//! `RawWriter`: same directory layout
//! (`<root>/<YYYY-MM-DD>/symbol=<SYM>/md_events_<NNNN>.jsonl`), same
//! rotation thresholds, same per-partition state shape. The Python
//! version keeps `(path, index, events_written)` in memory only; this
//! version additionally resumes from the highest-indexed file already on
//! disk so a restarted process doesn't clobber the prior run's log.

use crate::error::WriterError;
use shijim_core::calendar::trading_day;
use shijim_core::event::{MDBookEvent, MDTickEvent, MarketDataEvent};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 512 * 1024 * 1024;
const DEFAULT_MAX_EVENTS_PER_FILE: u64 = 1_000_000;

struct PartitionState {
    path: PathBuf,
    index: u32,
    bytes_written: u64,
    event_count: u64,
}

/// Append-only JSONL log writer with size/count-based rotation.
#[derive(Debug)]
pub struct RawWriter {
    root: PathBuf,
    max_file_size_bytes: u64,
    max_events_per_file: u64,
    state: Mutex<HashMap<(String, String), PartitionState>>,
}

impl RawWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            max_events_per_file: DEFAULT_MAX_EVENTS_PER_FILE,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_limits(mut self, max_file_size_bytes: u64, max_events_per_file: u64) -> Self {
        self.max_file_size_bytes = max_file_size_bytes;
        self.max_events_per_file = max_events_per_file;
        self
    }

    /// Serialize every tick then every book event to its partition file.
    pub fn write_batch(&self, ticks: &[MDTickEvent], books: &[MDBookEvent]) -> Result<(), WriterError> {
        for tick in ticks {
            self.write_event(tick.ts_ns, &tick.symbol, &MarketDataEvent::from(tick.clone()))?;
        }
        for book in books {
            self.write_event(book.ts_ns, &book.symbol, &MarketDataEvent::from(book.clone()))?;
        }
        Ok(())
    }

    /// The path and rotation index currently in use for `(symbol,
    /// trading_day)`, without touching the filesystem if already cached.
    pub fn current_file_info(&self, symbol: &str, trading_day: &str) -> (PathBuf, u32) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.get(&(trading_day.to_string(), symbol.to_string())) {
            Some(partition) => (partition.path.clone(), partition.index),
            None => {
                let dir = self.symbol_dir(trading_day, symbol);
                (dir.join("md_events_0001.jsonl"), 1)
            }
        }
    }

    fn symbol_dir(&self, trading_day: &str, symbol: &str) -> PathBuf {
        self.root.join(trading_day).join(format!("symbol={symbol}"))
    }

    fn write_event(&self, ts_ns: i64, symbol: &str, event: &MarketDataEvent) -> Result<(), WriterError> {
        let day = trading_day(ts_ns);
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let key = (day.clone(), symbol.to_string());
        if !state.contains_key(&key) {
            let partition = self.resume_or_create(&day, symbol)?;
            state.insert(key.clone(), partition);
        }

        let partition = state.get_mut(&key).expect("just inserted");
        if partition.bytes_written >= self.max_file_size_bytes
            || partition.event_count >= self.max_events_per_file
        {
            partition.index += 1;
            partition.path = partition.path.with_file_name(format!("md_events_{:04}.jsonl", partition.index));
            partition.bytes_written = 0;
            partition.event_count = 0;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&partition.path)
            .map_err(|source| WriterError::Io { path: partition.path.display().to_string(), source })?;
        file.write_all(&line)
            .map_err(|source| WriterError::Io { path: partition.path.display().to_string(), source })?;
        file.flush()
            .map_err(|source| WriterError::Io { path: partition.path.display().to_string(), source })?;

        partition.bytes_written += line.len() as u64;
        partition.event_count += 1;
        Ok(())
    }

    /// On first touch of a `(day, symbol)` partition this process,
    /// resume from the highest-indexed file already on disk rather than
    /// starting over at `_0001`. `event_count` starts at zero for the
    /// resumed file — only its on-disk byte size is known, so rotation
    /// for the remainder of this process is driven primarily by size
    /// until a fresh rotation resets both counters together.
    fn resume_or_create(&self, trading_day: &str, symbol: &str) -> Result<PartitionState, WriterError> {
        let dir = self.symbol_dir(trading_day, symbol);
        fs::create_dir_all(&dir)
            .map_err(|source| WriterError::Io { path: dir.display().to_string(), source })?;

        let highest = highest_existing_index(&dir)?;
        let (index, path) = match highest {
            Some(index) => (index, dir.join(format!("md_events_{index:04}.jsonl"))),
            None => (1, dir.join("md_events_0001.jsonl")),
        };

        let bytes_written = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(source) => return Err(WriterError::Io { path: path.display().to_string(), source }),
        };

        Ok(PartitionState { path, index, bytes_written, event_count: 0 })
    }
}

fn highest_existing_index(dir: &Path) -> Result<Option<u32>, WriterError> {
    if !dir.exists() {
        return Ok(None);
    }
    let entries = fs::read_dir(dir)
        .map_err(|source| WriterError::Io { path: dir.display().to_string(), source })?;

    let mut highest = None;
    for entry in entries {
        let entry = entry.map_err(|source| WriterError::Io { path: dir.display().to_string(), source })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(index) = parse_index(&name) {
            highest = Some(highest.map_or(index, |h: u32| h.max(index)));
        }
    }
    Ok(highest)
}

fn parse_index(filename: &str) -> Option<u32> {
    let stem = filename.strip_prefix("md_events_")?.strip_suffix(".jsonl")?;
    stem.parse().ok()
}
