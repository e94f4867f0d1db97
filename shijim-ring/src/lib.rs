#![warn(missing_debug_implementations, rust_2018_idioms)]
//! # shijim-ring
//!
//! Shared-memory ring buffer (spec §4.6) plus the SBE-style fixed-wire-
//! format decoder used to interpret each slot's payload. Grounded on
//! `examples/original_source/shijim/ipc/ring_buffer.py` (the Rust side is
//! the producer that Python file reads from) and
//! `examples/original_source/shijim/sbe/decoder.py`.
//!
//! This is the one crate in the workspace that does not
//! `#![forbid(unsafe_code)]`: a named shared-memory mapping is
//! inherently `unsafe` to construct (grounded on `memmap2`'s own API,
//! the same crate `cooprefr-bettersys` uses for shared metrics and
//! `joaquinbejar-OrderBook-rs`'s optional `journal` feature pairs with
//! `crc32fast`). Unsafe is confined to [`shared_mem`]; everything above
//! it (header/slot atomics, ring math, wire decoding) is safe Rust.

/// Shared-memory mapping, header/slot typed views.
pub mod shared_mem;

/// Ring math, producer and reader.
pub mod ring;

/// SBE-style wire encode/decode.
pub mod wire;

/// Error taxonomy for the ring buffer and wire decoder (spec §7:
/// "Consumer-observable (raise): ring-buffer stale reference or
/// integrity violation; wire-format buffer underflow").
pub mod error;

pub use error::RingError;
pub use ring::{RingProducer, RingReader};
pub use wire::{Decimal64, GroupHeader, SbeDecoder, SbeEncoder, SbeHeader};

/// Slots are always this size: an 8-byte `seq_num` header plus a
/// 248-byte payload region (spec §3: "Fixed slot layout").
pub const SLOT_SIZE: usize = 256;
pub const SLOT_PAYLOAD_SIZE: usize = 248;
/// Header region: one `u64` write cursor plus reserved padding to a
/// 128-byte boundary (spec §3).
pub const HEADER_SIZE: usize = 128;
/// Default ring capacity (spec §3). Must be a power of two.
pub const DEFAULT_CAPACITY: usize = 1024;
