use thiserror::Error;

/// Errors raised by the step and job state machines
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Invalid state value: {0}")]
    InvalidState(String),
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
