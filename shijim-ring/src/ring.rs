//! Single-producer/single-consumer ring math on top of [`shared_mem`].
//!
//! Grounded on `examples/original_source/shijim/ipc/ring_buffer.py`'s
//! writer/reader pair. The write cursor is a 1-based total-write-count;
//! slot index is `(cursor - 1) % capacity`. A reader validates a slot by
//! comparing the slot's own `seq_num` against the cursor it read:
//! equal means the read is consistent, less means the producer is
//! mid-write (retry), greater by a multiple of capacity means the
//! producer has lapped the consumer (stale, must resync).

use crate::error::RingError;
use crate::shared_mem::SharedRegion;
use crate::wire::{SbeDecoder, SbeHeader};
use std::path::Path;

/// Producer (writer) handle. Exactly one should exist per backing file.
#[derive(Debug)]
pub struct RingProducer {
    region: SharedRegion,
    capacity: u64,
}

impl RingProducer {
    pub fn create(path: &Path, capacity: usize) -> Result<Self, RingError> {
        let region = SharedRegion::create(path, capacity)?;
        Ok(Self { region, capacity: capacity as u64 })
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Current write cursor (total number of slots ever written).
    pub fn cursor(&self) -> u64 {
        self.region.header().load_acquire()
    }

    /// Write `payload` into the next slot and publish it. Returns the
    /// new cursor value (the slot's `seq_num`).
    pub fn write(&mut self, payload: &[u8]) -> u64 {
        let next_seq = self.cursor() + 1;
        let index = ((next_seq - 1) % self.capacity) as usize;

        let mut slot = self.region.slot_mut(index);
        slot.write_payload(payload);
        slot.set_seq_num(next_seq);
        drop(slot);

        self.region.header().store_release(next_seq);
        next_seq
    }
}

/// Consumer (reader) handle. Many readers may attach to the same
/// backing file concurrently; each tracks its own position.
#[derive(Debug)]
pub struct RingReader {
    region: SharedRegion,
    capacity: u64,
}

impl RingReader {
    pub fn open(path: &Path, capacity: usize) -> Result<Self, RingError> {
        let region = SharedRegion::open(path, capacity)?;
        Ok(Self { region, capacity: capacity as u64 })
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// The producer's current write cursor (acquire-ordered read).
    pub fn latest_cursor(&self) -> u64 {
        self.region.header().load_acquire()
    }

    /// Read the slot at total-write-count `cursor` (1-based). Fails if
    /// the producer has not written that far yet (`IntegrityViolation`)
    /// or has since lapped it (`StaleReference`).
    pub fn read_at(&self, cursor: u64) -> Result<Vec<u8>, RingError> {
        if cursor == 0 {
            return Err(RingError::NoDataWritten);
        }
        let index = ((cursor - 1) % self.capacity) as usize;
        let slot = self.region.slot(index);
        let slot_seq = slot.seq_num();

        if slot_seq < cursor {
            return Err(RingError::IntegrityViolation { expected: cursor, found: slot_seq });
        }
        if slot_seq > cursor && (slot_seq - cursor) % self.capacity == 0 {
            return Err(RingError::StaleReference { expected: cursor, found: slot_seq });
        }
        if slot_seq != cursor {
            return Err(RingError::IntegrityViolation { expected: cursor, found: slot_seq });
        }

        Ok(slot.payload().to_vec())
    }

    /// Read the most recently published slot. Errors with
    /// [`RingError::NoDataWritten`] before the first write.
    pub fn read_latest(&self) -> Result<(u64, Vec<u8>), RingError> {
        let cursor = self.latest_cursor();
        if cursor == 0 {
            return Err(RingError::NoDataWritten);
        }
        Ok((cursor, self.read_at(cursor)?))
    }

    /// Decode the SBE header of the slot at `cursor`, per spec §4.6: "the
    /// reader skips slots whose template id marks them as a heartbeat
    /// filler" — callers check `is_heartbeat()` here before paying for a
    /// full template-specific decode of the rest of the payload.
    pub fn read_header_at(&self, cursor: u64) -> Result<SbeHeader, RingError> {
        let payload = self.read_at(cursor)?;
        let mut decoder = SbeDecoder::new(&payload);
        decoder.read_header()
    }

    /// Decode the most recently published slot's SBE header.
    pub fn read_latest_header(&self) -> Result<(u64, SbeHeader), RingError> {
        let (cursor, payload) = self.read_latest()?;
        let mut decoder = SbeDecoder::new(&payload);
        Ok((cursor, decoder.read_header()?))
    }
}
