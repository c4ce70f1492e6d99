use super::{JobRepository, RepositoryError, RepositoryResult};
use crate::models::{JobExecution, RunId};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-local repository, shared by cloning
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobRepository {
    executions: Arc<RwLock<HashMap<RunId, JobExecution>>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.executions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.read().is_empty()
    }

    /// All executions of `job_name`, oldest first
    pub fn executions_of(&self, job_name: &str) -> Vec<JobExecution> {
        let mut found: Vec<JobExecution> = self
            .executions
            .read()
            .values()
            .filter(|e| e.job_name == job_name)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.started_at);
        found
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn save_job_execution(&self, execution: &JobExecution) -> RepositoryResult<()> {
        let mut executions = self.executions.write();
        if let Some(stored) = executions.get(&execution.run_id) {
            if stored.is_terminal() {
                return Err(RepositoryError::ImmutableExecution(execution.run_id));
            }
        }
        executions.insert(execution.run_id, execution.clone());
        Ok(())
    }

    async fn find_job_execution(&self, run_id: RunId) -> RepositoryResult<Option<JobExecution>> {
        Ok(self.executions.read().get(&run_id).cloned())
    }

    async fn last_job_execution(&self, job_name: &str) -> RepositoryResult<Option<JobExecution>> {
        Ok(self
            .executions
            .read()
            .values()
            .filter(|e| e.job_name == job_name)
            .max_by_key(|e| e.started_at)
            .cloned())
    }
}
