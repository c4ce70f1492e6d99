//! # Job Controller
//!
//! Sequences the steps of a [`JobDefinition`], derives the job status from its
//! step executions and records every state change in the [`JobRepository`].
//!
//! ## Restart
//!
//! Cursors are forward-only and keep no bookmark, so a restart cannot resume in
//! the middle of a step. `restart()` creates a new execution that:
//!
//! - copies the leading completed steps of the failed run as-is,
//! - re-runs the failed step from its first record,
//! - runs every later step normally.
//!
//! Rows committed by the failed step before it failed are still in the
//! destination; re-running it is only safe for idempotent writers or keyed
//! tables that reject duplicates.

use super::errors::{JobError, JobResult};
use super::job_definition::JobDefinition;
use super::step_executor::StepExecutor;
use super::stop::StopHandle;
use crate::logging::log_job_operation;
use crate::models::{JobExecution, RunId};
use crate::repository::JobRepository;
use crate::state_machine::{JobEvent, JobStateMachine, JobStatus};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct JobController {
    repository: Arc<dyn JobRepository>,
    stop: StopHandle,
}

impl JobController {
    pub fn new(repository: Arc<dyn JobRepository>) -> Self {
        Self {
            repository,
            stop: StopHandle::new(),
        }
    }

    /// Handle for requesting that the running step stops at its next chunk
    /// boundary. A request applies to the run in progress only; each run
    /// starts with it withdrawn.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn repository(&self) -> &Arc<dyn JobRepository> {
        &self.repository
    }

    /// Run `job` under a fresh run identifier.
    ///
    /// Step failures are reported in the returned execution; `Err` means the
    /// job could not be run or its history could not be recorded.
    #[instrument(skip_all, fields(job = %job.name()))]
    pub async fn run(&self, job: &mut JobDefinition) -> JobResult<JobExecution> {
        job.validate()?;
        let execution = JobExecution::new(job.name());
        self.execute(job, execution, 0).await
    }

    /// Run `job` again after the failed execution `run_id`
    #[instrument(skip_all, fields(job = %job.name(), restarted_from = %run_id))]
    pub async fn restart(&self, run_id: RunId, job: &mut JobDefinition) -> JobResult<JobExecution> {
        job.validate()?;

        let previous = self
            .repository
            .find_job_execution(run_id)
            .await?
            .ok_or(JobError::RunNotFound(run_id))?;

        if previous.job_name != job.name() {
            return Err(JobError::JobMismatch {
                run_id,
                expected: job.name().to_string(),
                found: previous.job_name,
            });
        }
        match previous.status {
            JobStatus::Failed => {}
            JobStatus::Completed => return Err(JobError::AlreadyComplete(run_id)),
            status => return Err(JobError::NotRestartable { run_id, status }),
        }

        // Carry over the completed prefix whose step names still line up
        let carried: Vec<_> = previous
            .steps
            .iter()
            .zip(job.step_names())
            .take_while(|(step, name)| step.is_completed() && step.step_name == *name)
            .map(|(step, _)| step.clone())
            .collect();

        let mut execution = JobExecution::new(job.name());
        execution.restarted_from = Some(run_id);
        let skip = carried.len();
        execution.steps = carried;

        info!(
            carried_steps = skip,
            resume_step = job.step_names().get(skip).copied().unwrap_or_default(),
            "restarting job"
        );
        self.execute(job, execution, skip).await
    }

    async fn execute(
        &self,
        job: &mut JobDefinition,
        mut execution: JobExecution,
        skip: usize,
    ) -> JobResult<JobExecution> {
        self.stop.clear();
        let mut state = JobStateMachine::new(job.name());
        self.repository.save_job_execution(&execution).await?;

        execution.status = state.transition(JobEvent::Start)?;
        self.repository.save_job_execution(&execution).await?;
        log_job_operation(
            "start",
            job.name(),
            &execution.run_id.to_string(),
            execution.status.batch_status(),
            None,
        );

        let expected_steps = job.steps().len();
        let executor = StepExecutor::new(self.stop.signal());

        for step in job.steps_mut().iter_mut().skip(skip) {
            let report = executor.execute(step).await;
            execution.steps.push(report.execution);

            if let Some(error) = report.error {
                warn!(
                    run_id = %execution.run_id,
                    step = %step.name(),
                    error = %error,
                    "step failed; halting job"
                );
                execution.failure = Some(error.failure_report(step.name()));
                break;
            }
            self.repository.save_job_execution(&execution).await?;
        }

        let event = match execution.derive_status(expected_steps) {
            JobStatus::Completed => JobEvent::Complete,
            _ => JobEvent::fail_with_error(
                execution
                    .failure
                    .as_ref()
                    .map(|f| f.message.clone())
                    .unwrap_or_else(|| "job did not complete all steps".to_string()),
            ),
        };
        execution.status = state.transition(event)?;
        execution.ended_at = Some(Utc::now());
        self.repository.save_job_execution(&execution).await?;

        info!(
            run_id = %execution.run_id,
            status = %execution.status,
            read = execution.read_count(),
            written = execution.write_count(),
            "job finished"
        );
        log_job_operation(
            "finish",
            job.name(),
            &execution.run_id.to_string(),
            execution.status.batch_status(),
            execution.failure.as_ref().map(|f| f.message.as_str()),
        );

        Ok(execution)
    }
}
