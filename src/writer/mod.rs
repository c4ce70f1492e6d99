//! # Transactional Writer
//!
//! Persists one chunk at a time as a single atomic unit. Each record is
//! serialized into an ordered parameter list matching the destination column
//! order and bound to one parameterized insert; any failure inside the chunk
//! rolls the whole chunk back.

pub mod memory;
pub mod mysql;

use crate::models::{Chunk, DestinationRecord, FieldValue};
use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryTable;
pub use mysql::MySqlChunkWriter;

/// Destination constraint or connectivity fault, scoped to one chunk
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error(
        "Chunk at offset {chunk_offset} ({chunk_size} records) rejected at record {failing_offset}: {reason}"
    )]
    Statement {
        chunk_offset: u64,
        chunk_size: usize,
        failing_offset: u64,
        reason: String,
    },

    #[error("Transaction for chunk at offset {chunk_offset} ({chunk_size} records) failed: {reason}")]
    Transaction {
        chunk_offset: u64,
        chunk_size: usize,
        reason: String,
    },
}

impl WriteError {
    pub fn statement(chunk: &Chunk, index: usize, reason: impl Into<String>) -> Self {
        Self::Statement {
            chunk_offset: chunk.offset(),
            chunk_size: chunk.len(),
            failing_offset: chunk.offset() + index as u64,
            reason: reason.into(),
        }
    }

    pub fn transaction(chunk: &Chunk, reason: impl Into<String>) -> Self {
        Self::Transaction {
            chunk_offset: chunk.offset(),
            chunk_size: chunk.len(),
            reason: reason.into(),
        }
    }

    pub fn chunk_offset(&self) -> u64 {
        match self {
            Self::Statement { chunk_offset, .. } | Self::Transaction { chunk_offset, .. } => {
                *chunk_offset
            }
        }
    }

    pub fn chunk_size(&self) -> usize {
        match self {
            Self::Statement { chunk_size, .. } | Self::Transaction { chunk_size, .. } => *chunk_size,
        }
    }

    /// Source offset of the rejected record, when a single record was at fault
    pub fn failing_offset(&self) -> Option<u64> {
        match self {
            Self::Statement { failing_offset, .. } => Some(*failing_offset),
            Self::Transaction { .. } => None,
        }
    }
}

/// Persists chunks to the destination store
#[async_trait]
pub trait ChunkWriter: Send + Sync {
    fn name(&self) -> &str;

    /// Write every record of `chunk` in one transaction: all or nothing
    async fn write(&self, chunk: &Chunk) -> Result<(), WriteError>;
}

/// A destination record has no value for a column of the insert statement
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("record has no value for column '{0}'")]
pub struct MissingColumn(pub String);

/// Serialize a record into bound parameters, in `columns` order
pub fn to_params(
    record: &DestinationRecord,
    columns: &[String],
) -> Result<Vec<FieldValue>, MissingColumn> {
    columns
        .iter()
        .map(|column| {
            record
                .get(column)
                .cloned()
                .ok_or_else(|| MissingColumn(column.clone()))
        })
        .collect()
}

/// Fixed parameterized insert against the destination table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    table: String,
    columns: Vec<String>,
}

impl InsertStatement {
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// `INSERT INTO t (a, b) VALUES (?, ?)`
    pub fn sql(&self) -> String {
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            placeholders
        )
    }
}
