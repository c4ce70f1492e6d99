use crate::mapping::MappingError;
use crate::models::{FailureKind, FailureReport, RunId};
use crate::reader::SourceReadError;
use crate::repository::RepositoryError;
use crate::state_machine::{JobStatus, StateMachineError};
use crate::writer::WriteError;
use thiserror::Error;

/// Fault that failed a chunk step, with the position of the chunk in flight
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("Source read failed in chunk at offset {chunk_offset} after {attempted} records: {source}")]
    SourceRead {
        source: SourceReadError,
        chunk_offset: u64,
        attempted: usize,
    },

    #[error("Mapping failed for record {record_offset} in chunk at offset {chunk_offset}: {source}")]
    Mapping {
        source: MappingError,
        chunk_offset: u64,
        attempted: usize,
        record_offset: u64,
    },

    #[error("Write failed: {0}")]
    Write(#[from] WriteError),

    #[error("Stop requested after {committed_chunks} committed chunks ({written} records written)")]
    Stopped {
        committed_chunks: u64,
        written: u64,
        next_offset: u64,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StateMachineError> for StepError {
    fn from(err: StateMachineError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl StepError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::SourceRead { .. } => FailureKind::SourceRead,
            Self::Mapping { .. } => FailureKind::Mapping,
            Self::Write(_) => FailureKind::Write,
            Self::Stopped { .. } => FailureKind::Stopped,
            Self::Internal(_) => FailureKind::Internal,
        }
    }

    /// Source offset of the chunk being processed when the step failed
    pub fn chunk_offset(&self) -> u64 {
        match self {
            Self::SourceRead { chunk_offset, .. } | Self::Mapping { chunk_offset, .. } => {
                *chunk_offset
            }
            Self::Write(err) => err.chunk_offset(),
            Self::Stopped { next_offset, .. } => *next_offset,
            Self::Internal(_) => 0,
        }
    }

    /// Records of the failed chunk that were attempted and discarded
    pub fn attempted(&self) -> usize {
        match self {
            Self::SourceRead { attempted, .. } | Self::Mapping { attempted, .. } => *attempted,
            Self::Write(err) => err.chunk_size(),
            Self::Stopped { .. } | Self::Internal(_) => 0,
        }
    }

    pub fn failing_offset(&self) -> Option<u64> {
        match self {
            Self::SourceRead { source, .. } => source.offset(),
            Self::Mapping { record_offset, .. } => Some(*record_offset),
            Self::Write(err) => err.failing_offset(),
            Self::Stopped { .. } | Self::Internal(_) => None,
        }
    }

    pub fn failure_report(&self, step_name: &str) -> FailureReport {
        FailureReport {
            step_name: step_name.to_string(),
            kind: self.kind(),
            message: self.to_string(),
            chunk_offset: self.chunk_offset(),
            chunk_size: self.attempted(),
            failing_offset: self.failing_offset(),
        }
    }
}

/// Errors that prevent a job from being run or restarted at all
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid job definition: {0}")]
    InvalidDefinition(String),

    #[error("Run {0} not found")]
    RunNotFound(RunId),

    #[error("Run {run_id} belongs to job '{found}', not '{expected}'")]
    JobMismatch {
        run_id: RunId,
        expected: String,
        found: String,
    },

    #[error("Run {0} already completed; nothing to restart")]
    AlreadyComplete(RunId),

    #[error("Run {run_id} is {status} and cannot be restarted")]
    NotRestartable { run_id: RunId, status: JobStatus },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("State transition error: {0}")]
    StateMachine(#[from] StateMachineError),
}

pub type JobResult<T> = Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failure_report() {
        let err = StepError::Write(WriteError::Statement {
            chunk_offset: 0,
            chunk_size: 200,
            failing_offset: 150,
            reason: "Duplicate entry '150' for key 'PRIMARY'".to_string(),
        });
        let report = err.failure_report("firstChunkStep");

        assert_eq!(report.kind, FailureKind::Write);
        assert_eq!(report.chunk_offset, 0);
        assert_eq!(report.chunk_size, 200);
        assert_eq!(report.failing_offset, Some(150));
        assert!(report.message.contains("Duplicate entry"));
    }

    #[test]
    fn test_mapping_failure_report() {
        let err = StepError::Mapping {
            source: MappingError::MissingField {
                field: "dept_id".to_string(),
            },
            chunk_offset: 400,
            attempted: 13,
            record_offset: 412,
        };
        assert_eq!(err.kind(), FailureKind::Mapping);
        assert_eq!(err.failing_offset(), Some(412));
        assert_eq!(
            err.to_string(),
            "Mapping failed for record 412 in chunk at offset 400: Required source field 'dept_id' is missing"
        );
    }
}
