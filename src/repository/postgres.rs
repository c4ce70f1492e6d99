//! # Postgres Job Repository
//!
//! Execution history in the dedicated job-repository database.
//!
//! ```sql
//! CREATE TABLE databridge_job_executions (
//!   run_id UUID PRIMARY KEY,
//!   job_name VARCHAR NOT NULL,
//!   status VARCHAR NOT NULL,
//!   restarted_from UUID,
//!   failure JSONB,
//!   started_at TIMESTAMPTZ NOT NULL,
//!   ended_at TIMESTAMPTZ
//! );
//!
//! CREATE TABLE databridge_step_executions (
//!   run_id UUID REFERENCES databridge_job_executions ON DELETE CASCADE,
//!   position INTEGER NOT NULL,
//!   step_name VARCHAR NOT NULL,
//!   -- status, counters, failure, timestamps
//!   PRIMARY KEY (run_id, step_name)
//! );
//! ```
//!
//! Each save runs in one transaction: the job row is locked, checked for a
//! terminal status, upserted, and its step rows are replaced.

use super::{JobRepository, RepositoryError, RepositoryResult};
use crate::database::DatabaseMigrations;
use crate::models::{FailureReport, JobExecution, RunId, StepExecution};
use crate::state_machine::{JobStatus, StepStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

const JOB_COLUMNS: &str =
    "run_id, job_name, status, restarted_from, failure, started_at, ended_at";

#[derive(Debug, Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct JobExecutionRow {
    run_id: Uuid,
    job_name: String,
    status: String,
    restarted_from: Option<Uuid>,
    failure: Option<Json<FailureReport>>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct StepExecutionRow {
    step_name: String,
    status: String,
    read_count: i64,
    write_count: i64,
    commit_count: i64,
    rollback_count: i64,
    failure: Option<Json<FailureReport>>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the repository tables if they do not exist
    pub async fn migrate(&self) -> RepositoryResult<()> {
        DatabaseMigrations::run_all(&self.pool).await?;
        Ok(())
    }

    async fn load_steps(&self, run_id: Uuid) -> RepositoryResult<Vec<StepExecution>> {
        let rows = sqlx::query_as::<_, StepExecutionRow>(
            r#"
            SELECT step_name, status, read_count, write_count, commit_count, rollback_count,
                   failure, started_at, ended_at
            FROM databridge_step_executions
            WHERE run_id = $1
            ORDER BY position
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StepExecutionRow::into_execution).collect()
    }

    async fn hydrate(&self, row: JobExecutionRow) -> RepositoryResult<JobExecution> {
        let steps = self.load_steps(row.run_id).await?;
        Ok(JobExecution {
            run_id: RunId::from(row.run_id),
            job_name: row.job_name,
            status: parse_status::<JobStatus>(&row.status)?,
            steps,
            restarted_from: row.restarted_from.map(RunId::from),
            started_at: row.started_at,
            ended_at: row.ended_at,
            failure: row.failure.map(|Json(f)| f),
        })
    }

    async fn replace_steps(
        tx: &mut Transaction<'_, Postgres>,
        execution: &JobExecution,
    ) -> RepositoryResult<()> {
        let run_id = execution.run_id.as_uuid();
        sqlx::query("DELETE FROM databridge_step_executions WHERE run_id = $1")
            .bind(run_id)
            .execute(&mut **tx)
            .await?;

        for (position, step) in execution.steps.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO databridge_step_executions
                    (run_id, position, step_name, status, read_count, write_count,
                     commit_count, rollback_count, failure, started_at, ended_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(run_id)
            .bind(to_db_count(position as u64)?)
            .bind(&step.step_name)
            .bind(step.status.to_string())
            .bind(to_db_count(step.read_count)?)
            .bind(to_db_count(step.write_count)?)
            .bind(to_db_count(step.commit_count)?)
            .bind(to_db_count(step.rollback_count)?)
            .bind(step.failure.clone().map(Json))
            .bind(step.started_at)
            .bind(step.ended_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

impl StepExecutionRow {
    fn into_execution(self) -> RepositoryResult<StepExecution> {
        Ok(StepExecution {
            step_name: self.step_name,
            status: parse_status::<StepStatus>(&self.status)?,
            read_count: from_db_count(self.read_count)?,
            write_count: from_db_count(self.write_count)?,
            commit_count: from_db_count(self.commit_count)?,
            rollback_count: from_db_count(self.rollback_count)?,
            started_at: self.started_at,
            ended_at: self.ended_at,
            failure: self.failure.map(|Json(f)| f),
        })
    }
}

fn parse_status<S: std::str::FromStr<Err = String>>(raw: &str) -> RepositoryResult<S> {
    raw.parse().map_err(RepositoryError::Corrupt)
}

fn to_db_count(value: u64) -> RepositoryResult<i64> {
    i64::try_from(value).map_err(|_| RepositoryError::Corrupt(format!("count {value} exceeds BIGINT")))
}

fn from_db_count(value: i64) -> RepositoryResult<u64> {
    u64::try_from(value).map_err(|_| RepositoryError::Corrupt(format!("negative count {value}")))
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn save_job_execution(&self, execution: &JobExecution) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        let stored: Option<String> = sqlx::query_scalar(
            "SELECT status FROM databridge_job_executions WHERE run_id = $1 FOR UPDATE",
        )
        .bind(execution.run_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(status) = stored {
            if parse_status::<JobStatus>(&status)?.is_terminal() {
                tx.rollback().await?;
                return Err(RepositoryError::ImmutableExecution(execution.run_id));
            }
        }

        sqlx::query(
            r#"
            INSERT INTO databridge_job_executions
                (run_id, job_name, status, restarted_from, failure, started_at, ended_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (run_id) DO UPDATE SET
                status = EXCLUDED.status,
                failure = EXCLUDED.failure,
                ended_at = EXCLUDED.ended_at
            "#,
        )
        .bind(execution.run_id.as_uuid())
        .bind(&execution.job_name)
        .bind(execution.status.to_string())
        .bind(execution.restarted_from.map(|id| id.as_uuid()))
        .bind(execution.failure.clone().map(Json))
        .bind(execution.started_at)
        .bind(execution.ended_at)
        .execute(&mut *tx)
        .await?;

        Self::replace_steps(&mut tx, execution).await?;
        tx.commit().await?;

        debug!(run_id = %execution.run_id, status = %execution.status, "saved job execution");
        Ok(())
    }

    async fn find_job_execution(&self, run_id: RunId) -> RepositoryResult<Option<JobExecution>> {
        let row = sqlx::query_as::<_, JobExecutionRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM databridge_job_executions WHERE run_id = $1"
        ))
        .bind(run_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn last_job_execution(&self, job_name: &str) -> RepositoryResult<Option<JobExecution>> {
        let row = sqlx::query_as::<_, JobExecutionRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM databridge_job_executions \
             WHERE job_name = $1 ORDER BY started_at DESC LIMIT 1"
        ))
        .bind(job_name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_conversions_reject_out_of_range() {
        assert_eq!(to_db_count(450).unwrap(), 450);
        assert!(to_db_count(u64::MAX).is_err());
        assert!(matches!(from_db_count(-1), Err(RepositoryError::Corrupt(_))));
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        assert_eq!(parse_status::<JobStatus>("failed").unwrap(), JobStatus::Failed);
        assert!(matches!(
            parse_status::<StepStatus>("paused"),
            Err(RepositoryError::Corrupt(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires a Postgres job repository (DATABRIDGE_JOB_REPOSITORY_URL)"]
    async fn test_round_trip_against_postgres() {
        let url = std::env::var("DATABRIDGE_JOB_REPOSITORY_URL").unwrap();
        let repo = PgJobRepository::new(PgPool::connect(&url).await.unwrap());
        repo.migrate().await.unwrap();

        let mut execution = JobExecution::new("chunkJob");
        let mut step = StepExecution::new("firstChunkStep");
        step.status = StepStatus::Completed;
        step.read_count = 450;
        step.write_count = 450;
        step.commit_count = 3;
        execution.steps.push(step);
        execution.status = JobStatus::Completed;
        execution.ended_at = Some(Utc::now());
        repo.save_job_execution(&execution).await.unwrap();

        let found = repo.find_job_execution(execution.run_id).await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Completed);
        assert_eq!(found.steps[0].write_count, 450);
        assert!(matches!(
            repo.save_job_execution(&execution).await,
            Err(RepositoryError::ImmutableExecution(_))
        ));
    }
}
