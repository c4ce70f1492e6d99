use thiserror::Error;

use crate::config::ConfigurationError;
use crate::orchestration::errors::JobError;
use crate::repository::RepositoryError;
use crate::state_machine::errors::StateMachineError;

/// Crate-wide error for callers that drive whole jobs (bootstrap, CLI).
///
/// Chunk-level faults never surface here directly: they are captured in the
/// `FailureReport` of the returned `JobExecution`.
#[derive(Debug, Error)]
pub enum DataBridgeError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("State transition error: {0}")]
    StateTransition(#[from] StateMachineError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),
}

pub type Result<T> = std::result::Result<T, DataBridgeError>;
