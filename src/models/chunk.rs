//! # Chunks
//!
//! `ChunkBuffer` accumulates mapped records until the configured size is
//! reached; `drain()` hands out the accumulated `Chunk` and resets. The buffer
//! tracks the absolute source offset of the chunk it is currently filling so
//! that failures can be reported against source positions.

use super::record::DestinationRecord;
use serde::Serialize;
use std::num::NonZeroUsize;
use thiserror::Error;

/// Ordered batch of destination records persisted as one atomic unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    offset: u64,
    records: Vec<DestinationRecord>,
}

impl Chunk {
    pub fn new(offset: u64, records: Vec<DestinationRecord>) -> Self {
        Self { offset, records }
    }

    /// Zero-based source position of the first record in this chunk
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DestinationRecord] {
        &self.records
    }
}

/// Result of adding a record to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStatus {
    Accepting,
    Full,
}

/// Returned when a record is added to a buffer that is already full.
/// The rejected record is handed back untouched.
#[derive(Debug, Error)]
#[error("chunk buffer is full ({capacity} records); drain before adding")]
pub struct BufferOverflow {
    pub capacity: usize,
    pub record: DestinationRecord,
}

/// Fixed-size accumulator for mapped records
#[derive(Debug)]
pub struct ChunkBuffer {
    capacity: NonZeroUsize,
    offset: u64,
    records: Vec<DestinationRecord>,
}

impl ChunkBuffer {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            offset: 0,
            records: Vec::with_capacity(capacity.get()),
        }
    }

    /// Append a record; reports `Full` once the configured size is reached
    pub fn add(&mut self, record: DestinationRecord) -> Result<BufferStatus, BufferOverflow> {
        if self.is_full() {
            return Err(BufferOverflow {
                capacity: self.capacity.get(),
                record,
            });
        }
        self.records.push(record);
        Ok(if self.is_full() {
            BufferStatus::Full
        } else {
            BufferStatus::Accepting
        })
    }

    /// Take the accumulated chunk and reset to empty
    pub fn drain(&mut self) -> Chunk {
        let records = std::mem::replace(&mut self.records, Vec::with_capacity(self.capacity.get()));
        let chunk = Chunk::new(self.offset, records);
        self.offset += chunk.len() as u64;
        chunk
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity.get()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Source offset of the chunk currently being filled
    pub fn offset(&self) -> u64 {
        self.offset
    }
}
