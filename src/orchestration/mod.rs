//! # Orchestration Engine
//!
//! Chunk-oriented execution of jobs.
//!
//! ## Core Components
//!
//! - **JobDefinition / ChunkStep**: explicit composition of a job from concrete
//!   cursors, mappers and writers
//! - **StepExecutor**: drives cursor → mapper → buffer → writer for one step,
//!   committing exactly one transaction per chunk
//! - **JobController**: runs steps in order, halts at the first failure, records
//!   history in the job repository and restarts failed runs
//! - **StopHandle**: cooperative stop honoured between chunks
//!
//! ## Failure Model
//!
//! Source read, mapping and write faults are all fatal to the step. The failing
//! chunk is rolled back, the step is marked failed, and the job reports the
//! chunk offset, the number of records attempted and, when known, the source
//! offset of the offending record.

pub mod errors;
pub mod job_controller;
pub mod job_definition;
pub mod step_executor;
pub mod stop;

pub use errors::{JobError, JobResult, StepError};
pub use job_controller::JobController;
pub use job_definition::{ChunkStep, ChunkStepBuilder, JobDefinition, DEFAULT_CHUNK_SIZE};
pub use step_executor::{StepExecutor, StepReport};
pub use stop::{StopHandle, StopSignal};
