use thiserror::Error;

#[derive(Debug, Error)]
pub enum RingError {
    /// Ring capacity must be a power of two (spec §3).
    #[error("ring capacity {0} is not a power of two")]
    CapacityNotPowerOfTwo(usize),

    /// Producer has not finished writing the slot yet, or its `seq_num`
    /// was never set (retry the read). Spec §4.6: "producer has not yet
    /// finished the write, or sequence was never set".
    #[error("integrity violation: expected seq_num {expected}, found {found}")]
    IntegrityViolation { expected: u64, found: u64 },

    /// The producer has lapped the consumer; the requested cursor's data
    /// is gone. Spec §4.6: "producer has lapped the consumer — data is
    /// lost; consumer must resync to current cursor".
    #[error("stale reference: expected seq_num {expected}, found {found} (producer lapped consumer)")]
    StaleReference { expected: u64, found: u64 },

    /// No data has ever been written (`write_cursor == 0`).
    #[error("no data written yet (write_cursor is 0)")]
    NoDataWritten,

    /// Wire decoding ran past the end of the available bytes.
    #[error("buffer underflow: needed {needed} bytes at offset {offset}, have {available}")]
    BufferUnderflow { offset: usize, needed: usize, available: usize },

    #[error("shared memory io error: {0}")]
    Io(#[from] std::io::Error),

    /// Slot size mismatch between the declared schema and the mapped
    /// region — fatal per spec §7 ("invalid ring-buffer slot-size vs
    /// schema mismatch").
    #[error("slot size mismatch: region has {found} bytes per slot, schema requires {expected}")]
    SlotSizeMismatch { expected: usize, found: usize },
}
