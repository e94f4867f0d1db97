//! Named shared-memory mapping, and the typed `HeaderRef`/`SlotRef`
//! handles the Design Note calls for ("a typed shared-memory region
//! abstraction that owns the mapping and hands out two handles...
//! with explicit acquire/release memory ordering; lifetime of handles
//! is tied to the mapping").

use crate::error::RingError;
use crate::{HEADER_SIZE, SLOT_SIZE};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// A mapped shared-memory region sized for `HEADER_SIZE + capacity *
/// SLOT_SIZE` bytes, backed by a regular file (the portable stand-in for
/// `/dev/shm/<name>` the original reader expects).
pub struct SharedRegion {
    mmap: MmapMut,
    capacity: usize,
}

impl std::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion").field("capacity", &self.capacity).finish()
    }
}

impl SharedRegion {
    fn total_size(capacity: usize) -> usize {
        HEADER_SIZE + capacity * SLOT_SIZE
    }

    /// Create (or truncate-and-reuse) the backing file at `path` and map
    /// it read-write. The producer side of the ring owns the only
    /// `SharedRegion` that should ever write.
    pub fn create(path: &Path, capacity: usize) -> Result<Self, RingError> {
        if !capacity.is_power_of_two() {
            return Err(RingError::CapacityNotPowerOfTwo(capacity));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let size = Self::total_size(capacity) as u64;
        file.set_len(size)?;

        // SAFETY: `file` is owned exclusively by this call for the
        // duration of the mapping's lifetime and is sized to exactly
        // `size` bytes above; no other process is expected to truncate
        // it while mapped (the same caveat the original shared-memory
        // reader documents).
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { mmap, capacity })
    }

    /// Attach to an existing region for reading (or for a reader that
    /// also happens to hold write access, matching the original Python
    /// reader's `ACCESS_WRITE` mapping).
    pub fn open(path: &Path, capacity: usize) -> Result<Self, RingError> {
        if !capacity.is_power_of_two() {
            return Err(RingError::CapacityNotPowerOfTwo(capacity));
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let expected = Self::total_size(capacity) as u64;
        let actual = file.metadata()?.len();
        if actual != expected {
            return Err(RingError::SlotSizeMismatch {
                expected: expected as usize,
                found: actual as usize,
            });
        }

        // SAFETY: see `create`; the caller is responsible for ensuring
        // the producer that owns this file keeps it alive and correctly
        // sized for the lifetime of this mapping.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { mmap, capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handle to the header's monotonically increasing write cursor.
    pub fn header(&self) -> HeaderRef<'_> {
        // SAFETY: `self.mmap` is at least HEADER_SIZE (>= 8) bytes, and
        // offset 0 is 8-byte aligned because the mapping itself is
        // page-aligned. The `AtomicU64` is only ever accessed through
        // this method, so all accesses go through atomic load/store.
        let cursor = unsafe { &*(self.mmap.as_ptr() as *const AtomicU64) };
        HeaderRef { cursor }
    }

    /// Handle to slot `index` (0-based, `index < capacity`).
    pub fn slot(&self, index: usize) -> SlotRef<'_> {
        assert!(index < self.capacity, "slot index {index} out of range");
        let offset = HEADER_SIZE + index * SLOT_SIZE;
        let base = &self.mmap[offset..offset + SLOT_SIZE];
        // SAFETY: `base` points at a SLOT_SIZE-byte, 8-byte-aligned
        // (offset is a multiple of SLOT_SIZE=256 added to a page-aligned
        // base) region within the mapping; the first 8 bytes are the
        // slot's `seq_num`, accessed only as an `AtomicU64`.
        let seq_num = unsafe { &*(base.as_ptr() as *const AtomicU64) };
        SlotRef { seq_num, payload: &base[8..] }
    }

    /// Mutable handle to slot `index`, for the producer.
    pub fn slot_mut(&mut self, index: usize) -> SlotMut<'_> {
        assert!(index < self.capacity, "slot index {index} out of range");
        let offset = HEADER_SIZE + index * SLOT_SIZE;
        let base = &mut self.mmap[offset..offset + SLOT_SIZE];
        let seq_ptr = base.as_mut_ptr() as *const AtomicU64;
        // SAFETY: see `slot`; `seq_num` and `payload` are disjoint
        // sub-slices of `base` and are never aliased simultaneously
        // because `payload` starts at byte 8.
        let seq_num = unsafe { &*seq_ptr };
        SlotMut { seq_num, payload: &mut base[8..] }
    }
}

/// Read/write handle to the ring's write cursor.
pub struct HeaderRef<'a> {
    cursor: &'a AtomicU64,
}

impl HeaderRef<'_> {
    /// Acquire-ordered read, per spec §4.6: "The consumer reads
    /// `write_cursor` (acquire semantics)".
    pub fn load_acquire(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Release-ordered write, per spec §4.6: "the producer writes slot
    /// payload then publishes by incrementing `write_cursor` (release
    /// semantics)".
    pub fn store_release(&self, value: u64) {
        self.cursor.store(value, Ordering::Release);
    }
}

/// Read-only handle to one ring slot.
pub struct SlotRef<'a> {
    seq_num: &'a AtomicU64,
    payload: &'a [u8],
}

impl<'a> SlotRef<'a> {
    pub fn seq_num(&self) -> u64 {
        self.seq_num.load(Ordering::Relaxed)
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

/// Mutable handle to one ring slot, held only by the producer.
pub struct SlotMut<'a> {
    seq_num: &'a AtomicU64,
    payload: &'a mut [u8],
}

impl SlotMut<'_> {
    /// Copy `bytes` into the slot's payload region, zero-padding the
    /// remainder. Truncates silently if `bytes` is longer than the slot
    /// payload — jumbo frames are the caller's (upstream encoder's)
    /// concern, not this layer's.
    pub fn write_payload(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(self.payload.len());
        self.payload[..n].copy_from_slice(&bytes[..n]);
        for b in &mut self.payload[n..] {
            *b = 0;
        }
    }

    /// Publish this slot's sequence number. Ordinary (relaxed) store is
    /// sufficient: the header's subsequent `store_release` of the write
    /// cursor is the synchronization point readers acquire against, so
    /// this write is guaranteed visible once the cursor update is
    /// observed.
    pub fn set_seq_num(&self, seq: u64) {
        self.seq_num.store(seq, Ordering::Relaxed);
    }
}
