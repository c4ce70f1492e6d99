use super::{
    errors::{StateMachineError, StateMachineResult},
    events::StepEvent,
    states::StepStatus,
};
use tracing::debug;

/// Step lifecycle: `Pending -> Running -> {Completed, Failed}`
#[derive(Debug, Clone, Default)]
pub struct StepStateMachine {
    step_name: String,
    state: StepStatus,
}

impl StepStateMachine {
    pub fn new(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            state: StepStatus::Pending,
        }
    }

    pub fn current_state(&self) -> StepStatus {
        self.state
    }

    /// Attempt to transition the step state
    pub fn transition(&mut self, event: StepEvent) -> StateMachineResult<StepStatus> {
        let target = Self::determine_target_state(self.state, &event)?;
        debug!(
            step = %self.step_name,
            from = %self.state,
            to = %target,
            event = event.event_type(),
            "step transition"
        );
        self.state = target;
        Ok(target)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: StepStatus,
        event: &StepEvent,
    ) -> StateMachineResult<StepStatus> {
        let target = match (current_state, event) {
            (StepStatus::Pending, StepEvent::Start) => StepStatus::Running,
            (StepStatus::Running, StepEvent::Complete) => StepStatus::Completed,
            (StepStatus::Running, StepEvent::Fail(_)) => StepStatus::Failed,
            // cursor could not be opened
            (StepStatus::Pending, StepEvent::Fail(_)) => StepStatus::Failed,

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

    pub fn step_name(&self) -> &str {
        &self.step_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut sm = StepStateMachine::new("copy_students");
        assert_eq!(sm.transition(StepEvent::Start).unwrap(), StepStatus::Running);
        assert_eq!(sm.transition(StepEvent::Complete).unwrap(), StepStatus::Completed);
        assert!(sm.is_terminal());
    }

    #[test]
    fn test_fail_from_pending_and_running() {
        let mut pending = StepStateMachine::new("s");
        assert_eq!(
            pending.transition(StepEvent::fail_with_error("open failed")).unwrap(),
            StepStatus::Failed
        );

        let mut running = StepStateMachine::new("s");
        running.transition(StepEvent::Start).unwrap();
        assert_eq!(
            running.transition(StepEvent::fail_with_error("write failed")).unwrap(),
            StepStatus::Failed
        );
    }

    #[test]
    fn test_terminal_states_reject_events() {
        let mut sm = StepStateMachine::new("s");
        sm.transition(StepEvent::Start).unwrap();
        sm.transition(StepEvent::Complete).unwrap();

        let err = sm.transition(StepEvent::Start).unwrap_err();
        assert_eq!(
            err,
            StateMachineError::InvalidTransition {
                from: "completed".to_string(),
                event: "start".to_string(),
            }
        );
        assert_eq!(sm.current_state(), StepStatus::Completed);
    }

    #[test]
    fn test_cannot_complete_without_start() {
        let result = StepStateMachine::determine_target_state(StepStatus::Pending, &StepEvent::Complete);
        assert!(result.is_err());
    }
}
