use super::{RecordCursor, SourceReadError};
use crate::models::SourceRecord;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory cursor over a fixed list of records, with optional fault injection
#[derive(Debug)]
pub struct MemoryCursor {
    name: String,
    records: Vec<SourceRecord>,
    position: usize,
    open: bool,
    fail_at: Option<(usize, SourceReadError)>,
    closes: Arc<AtomicUsize>,
}

impl MemoryCursor {
    pub fn new(name: impl Into<String>, records: Vec<SourceRecord>) -> Self {
        Self {
            name: name.into(),
            records,
            position: 0,
            open: false,
            fail_at: None,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Return `error` instead of the record at `position`
    pub fn fail_at(mut self, position: usize, error: SourceReadError) -> Self {
        self.fail_at = Some((position, error));
        self
    }

    /// Shared counter of `close()` calls
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

#[async_trait]
impl RecordCursor for MemoryCursor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self) -> Result<(), SourceReadError> {
        self.position = 0;
        self.open = true;
        Ok(())
    }

    async fn next(&mut self) -> Result<Option<SourceRecord>, SourceReadError> {
        if !self.open {
            return Err(SourceReadError::NotOpen);
        }
        if let Some((position, error)) = &self.fail_at {
            if *position == self.position {
                return Err(error.clone());
            }
        }
        let record = self.records.get(self.position).cloned();
        if record.is_some() {
            self.position += 1;
        }
        Ok(record)
    }

    async fn close(&mut self) -> Result<(), SourceReadError> {
        self.open = false;
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
