#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]
//! # shijim-ingest
//!
//! The ingestion worker and its two writers: an append-only partitioned
//! raw log, and a batched columnar sink with on-disk fallback.
//! Grounded on `examples/original_source/shijim/recorder/ingestion.py`,
//! `.../recorder/raw_writer.py`, and `.../recorder/clickhouse_writer.py`.

/// Error taxonomy shared by all writers and the worker.
pub mod error;

/// Append-only, trading-day/symbol-partitioned JSONL log.
pub mod raw_writer;

/// Batched columnar sink with retry/backoff/fallback state machine.
pub mod columnar_writer;

/// Long-running buffering/flush task that fans events out to writers.
pub mod worker;

pub use error::WriterError;
pub use raw_writer::RawWriter;
pub use columnar_writer::{ColumnarClient, ColumnarWriter, ColumnarWriterState};
pub use worker::{IngestionConfig, IngestionWorker, Writer};
