//! # Job Repository
//!
//! Durable history of job executions. The controller saves an execution when it
//! starts, after every step, and once more when it reaches a terminal status.
//! A stored terminal execution is never overwritten; restarts are new rows.

use crate::models::{JobExecution, RunId};
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryJobRepository;
pub use postgres::PgJobRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Execution {0} is terminal and cannot be modified")]
    ImmutableExecution(RunId),

    #[error("Stored execution is corrupt: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Storage of job execution history
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert or update `execution`. Fails with `ImmutableExecution` when the
    /// stored copy is already terminal.
    async fn save_job_execution(&self, execution: &JobExecution) -> RepositoryResult<()>;

    async fn find_job_execution(&self, run_id: RunId) -> RepositoryResult<Option<JobExecution>>;

    /// Most recently started execution of `job_name`
    async fn last_job_execution(&self, job_name: &str) -> RepositoryResult<Option<JobExecution>>;
}
