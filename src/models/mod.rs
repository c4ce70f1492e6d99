pub mod chunk;
pub mod execution;
pub mod record;

// Re-export core models for easy access
pub use chunk::{BufferOverflow, BufferStatus, Chunk, ChunkBuffer};
pub use execution::{FailureKind, FailureReport, JobExecution, RunId, StepExecution};
pub use record::{DestinationRecord, FieldType, FieldValue, Record, SourceRecord};
