use super::{ChunkWriter, WriteError};
use crate::models::{Chunk, DestinationRecord, FieldValue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Default)]
struct TableState {
    rows: Vec<DestinationRecord>,
    keys: HashSet<FieldValue>,
    committed_chunks: Vec<usize>,
    write_calls: usize,
    reject_offset: Option<u64>,
}

/// In-memory destination table with a unique key column.
///
/// A chunk is staged in full and published only if every record passes, so a
/// rejected chunk leaves the table exactly as it was. Clones share the table.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    key_column: String,
    state: Arc<Mutex<TableState>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, key_column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_column: key_column.into(),
            state: Arc::new(Mutex::new(TableState::default())),
        }
    }

    /// Reject the record at this absolute source offset
    pub fn reject_offset(self, offset: u64) -> Self {
        self.state.lock().reject_offset = Some(offset);
        self
    }

    pub fn clear_rejection(&self) {
        self.state.lock().reject_offset = None;
    }

    /// Seed a row outside of any chunk, e.g. to provoke a duplicate key
    pub fn insert_existing(&self, record: DestinationRecord) {
        let mut state = self.state.lock();
        if let Some(key) = record.get(&self.key_column).cloned() {
            state.keys.insert(key);
        }
        state.rows.push(record);
    }

    pub fn rows(&self) -> Vec<DestinationRecord> {
        self.state.lock().rows.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sizes of the committed chunks in commit order
    pub fn committed_chunks(&self) -> Vec<usize> {
        self.state.lock().committed_chunks.clone()
    }

    pub fn write_calls(&self) -> usize {
        self.state.lock().write_calls
    }
}

#[async_trait]
impl ChunkWriter for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, chunk: &Chunk) -> Result<(), WriteError> {
        let mut state = self.state.lock();
        state.write_calls += 1;

        let mut staged_keys = HashSet::with_capacity(chunk.len());
        for (index, record) in chunk.records().iter().enumerate() {
            let offset = chunk.offset() + index as u64;
            if state.reject_offset == Some(offset) {
                return Err(WriteError::statement(chunk, index, "record rejected by destination"));
            }

            let key = record.get(&self.key_column).cloned().ok_or_else(|| {
                WriteError::statement(chunk, index, format!("missing key column '{}'", self.key_column))
            })?;
            if state.keys.contains(&key) || !staged_keys.insert(key.clone()) {
                return Err(WriteError::statement(
                    chunk,
                    index,
                    format!("duplicate key {key} for {}", self.key_column),
                ));
            }
        }

        state.keys.extend(staged_keys);
        state.rows.extend(chunk.records().iter().cloned());
        state.committed_chunks.push(chunk.len());
        Ok(())
    }
}
