// State machines for chunk step and job execution lifecycles
//
// Transitions are pure in-memory checks; persisting the resulting execution
// records is the job repository's concern.

pub mod errors;
pub mod events;
pub mod job_state_machine;
pub mod states;
pub mod step_state_machine;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::{JobEvent, StepEvent};
pub use job_state_machine::JobStateMachine;
pub use states::{JobStatus, StepStatus};
pub use step_state_machine::StepStateMachine;
