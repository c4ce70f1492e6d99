//! # Record Cursor
//!
//! Forward-only, read-only streams of source records. A cursor is opened once
//! per step execution, drained in arrival order, and closed on every exit path.
//! Read faults are never retried here; they propagate to the step executor.

pub mod memory;
pub mod postgres;

use crate::models::SourceRecord;
use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryCursor;
pub use postgres::PgRecordCursor;

/// Connectivity or row-decoding fault while reading the source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceReadError {
    #[error("Cursor is not open")]
    NotOpen,

    #[error("Source connection failed: {0}")]
    Connection(String),

    #[error("Malformed row at offset {offset}: {reason}")]
    MalformedRow { offset: u64, reason: String },
}

impl SourceReadError {
    /// Source position of the offending row, when the fault is row-specific
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::MalformedRow { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for SourceReadError {
    fn from(err: sqlx::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Sequential producer of source records
#[async_trait]
pub trait RecordCursor: Send {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// Establish the result stream. Re-opening a closed cursor restarts the
    /// query from its first row.
    async fn open(&mut self) -> Result<(), SourceReadError>;

    /// Next record in arrival order, `None` once the source is exhausted
    async fn next(&mut self) -> Result<Option<SourceRecord>, SourceReadError>;

    /// Release underlying resources. Must succeed on a cursor that was never
    /// opened or never read from, and may be called more than once.
    async fn close(&mut self) -> Result<(), SourceReadError>;
}
