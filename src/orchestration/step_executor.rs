//! # Step Executor
//!
//! Drives one chunk step from `Pending` to `Completed` or `Failed`:
//!
//! ```text
//! open cursor
//! loop:
//!     next record
//!     [stop requested, more records?] -> Failed(Stopped)   (only between chunks)
//!     map -> buffer.add
//!     buffer full      -> write chunk (one transaction) -> commit
//!     cursor exhausted -> write partial chunk if any -> Completed
//! close cursor (every exit path)
//! ```
//!
//! Reads never overlap a chunk write: the writer holds its transaction only for
//! the duration of `write()`, and the next record is fetched after it returns.
//! Any read, mapping or write fault ends the step; there is no retry at this
//! layer.

use super::errors::StepError;
use super::job_definition::ChunkStep;
use super::stop::StopSignal;
use crate::logging::{log_chunk_operation, log_step_operation};
use crate::models::{BufferStatus, ChunkBuffer, StepExecution};
use crate::state_machine::{StepEvent, StepStateMachine};
use chrono::Utc;
use tracing::{info, instrument, warn};

/// Outcome of one step execution. `error` is set exactly when the step failed.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub execution: StepExecution,
    pub error: Option<StepError>,
}

impl StepReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Sequential chunk-oriented executor
#[derive(Debug, Clone)]
pub struct StepExecutor {
    stop: StopSignal,
}

impl StepExecutor {
    pub fn new(stop: StopSignal) -> Self {
        Self { stop }
    }

    /// Run `step` to completion or failure
    #[instrument(skip_all, fields(step = %step.name(), chunk_size = step.chunk_size().get()))]
    pub async fn execute(&self, step: &mut ChunkStep) -> StepReport {
        let mut state = StepStateMachine::new(step.name());
        let mut execution = StepExecution::new(step.name());
        execution.started_at = Some(Utc::now());

        log_step_operation("start", step.name(), execution.status.batch_status(), None);

        let result = match step.cursor.open().await {
            Ok(()) => match state.transition(StepEvent::Start) {
                Ok(status) => {
                    execution.status = status;
                    self.process_chunks(step, &mut execution).await
                }
                Err(e) => Err(StepError::from(e)),
            },
            Err(source) => Err(StepError::SourceRead {
                source,
                chunk_offset: 0,
                attempted: 0,
            }),
        };

        if let Err(e) = step.cursor.close().await {
            warn!(cursor = step.cursor.name(), error = %e, "failed to close cursor");
        }

        let error = match result {
            Ok(()) => match state.transition(StepEvent::Complete) {
                Ok(status) => {
                    execution.status = status;
                    None
                }
                Err(e) => Some(StepError::from(e)),
            },
            Err(error) => Some(error),
        };

        if let Some(error) = &error {
            if error.attempted() > 0 {
                execution.rollback_count += 1;
            }
            // Pending and Running both accept Fail
            execution.status = state
                .transition(StepEvent::fail_with_error(error.to_string()))
                .unwrap_or(crate::state_machine::StepStatus::Failed);
            execution.failure = Some(error.failure_report(step.name()));
        }

        execution.ended_at = Some(Utc::now());

        info!(
            status = %execution.status,
            read = execution.read_count,
            written = execution.write_count,
            commits = execution.commit_count,
            "step finished"
        );
        log_step_operation(
            "finish",
            step.name(),
            execution.status.batch_status(),
            error.as_ref().map(ToString::to_string).as_deref(),
        );

        StepReport { execution, error }
    }

    async fn process_chunks(
        &self,
        step: &mut ChunkStep,
        execution: &mut StepExecution,
    ) -> Result<(), StepError> {
        let mut buffer = ChunkBuffer::new(step.chunk_size());
        let mut position: u64 = 0;

        loop {
            let stopping = buffer.is_empty() && self.stop.is_requested();

            let next = step
                .cursor
                .next()
                .await
                .map_err(|source| StepError::SourceRead {
                    source,
                    chunk_offset: buffer.offset(),
                    attempted: buffer.len(),
                })?;

            // an exhausted source completes even when a stop was requested
            if stopping && next.is_some() {
                return Err(StepError::Stopped {
                    committed_chunks: execution.commit_count,
                    written: execution.write_count,
                    next_offset: buffer.offset(),
                });
            }

            let Some(record) = next else {
                if !buffer.is_empty() {
                    Self::write_chunk(step, &mut buffer, execution).await?;
                }
                return Ok(());
            };

            execution.read_count += 1;
            let mapped = step.mapper.map(&record).map_err(|source| StepError::Mapping {
                source,
                chunk_offset: buffer.offset(),
                attempted: buffer.len() + 1,
                record_offset: position,
            })?;
            position += 1;

            match buffer.add(mapped) {
                Ok(BufferStatus::Full) => Self::write_chunk(step, &mut buffer, execution).await?,
                Ok(BufferStatus::Accepting) => {}
                Err(overflow) => return Err(StepError::Internal(overflow.to_string())),
            }
        }
    }

    async fn write_chunk(
        step: &ChunkStep,
        buffer: &mut ChunkBuffer,
        execution: &mut StepExecution,
    ) -> Result<(), StepError> {
        let chunk = buffer.drain();
        let offset = chunk.offset();
        let size = chunk.len();

        match step.writer.write(&chunk).await {
            Ok(()) => {
                execution.write_count += size as u64;
                execution.commit_count += 1;
                log_chunk_operation(step.name(), offset, size, "committed", None);
                Ok(())
            }
            Err(e) => {
                log_chunk_operation(step.name(), offset, size, "rolled_back", Some(&e.to_string()));
                Err(StepError::Write(e))
            }
        }
    }
}
