use super::{
    errors::{StateMachineError, StateMachineResult},
    events::JobEvent,
    states::JobStatus,
};
use tracing::debug;

/// Job lifecycle: `Starting -> Started -> {Completed, Failed}`
#[derive(Debug, Clone, Default)]
pub struct JobStateMachine {
    job_name: String,
    state: JobStatus,
}

impl JobStateMachine {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            state: JobStatus::Starting,
        }
    }

    pub fn current_state(&self) -> JobStatus {
        self.state
    }

    pub fn transition(&mut self, event: JobEvent) -> StateMachineResult<JobStatus> {
        let target = Self::determine_target_state(self.state, &event)?;
        debug!(
            job = %self.job_name,
            from = %self.state,
            to = %target,
            event = event.event_type(),
            "job transition"
        );
        self.state = target;
        Ok(target)
    }

    pub fn determine_target_state(
        current_state: JobStatus,
        event: &JobEvent,
    ) -> StateMachineResult<JobStatus> {
        let target = match (current_state, event) {
            (JobStatus::Starting, JobEvent::Start) => JobStatus::Started,
            (JobStatus::Started, JobEvent::Complete) => JobStatus::Completed,
            (JobStatus::Started, JobEvent::Fail(_)) => JobStatus::Failed,
            (JobStatus::Starting, JobEvent::Fail(_)) => JobStatus::Failed,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
