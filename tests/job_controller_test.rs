//! Job sequencing, history, restart and stop behaviour

mod common;

use async_trait::async_trait;
use common::*;
use databridge::models::{Chunk, FailureKind};
use databridge::orchestration::{ChunkStep, JobController, JobDefinition, JobError, StopHandle};
use databridge::repository::{JobRepository, RepositoryError};
use databridge::state_machine::{JobStatus, StepStatus};
use databridge::writer::{ChunkWriter, MemoryTable, WriteError};

/// Writer that requests a stop once it has committed `after` chunks
struct StoppingWriter {
    table: MemoryTable,
    stop: StopHandle,
    after: usize,
}

#[async_trait]
impl ChunkWriter for StoppingWriter {
    fn name(&self) -> &str {
        "stopping"
    }

    async fn write(&self, chunk: &Chunk) -> Result<(), WriteError> {
        self.table.write(chunk).await?;
        if self.table.committed_chunks().len() >= self.after {
            self.stop.request_stop();
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_history_is_saved_for_every_run() {
    let (controller, repository) = controller();
    let (mut job, _) = StudentJobBuilder::new(students(5)).build();

    let first = controller.run(&mut job).await.unwrap();
    let second = controller.run(&mut job).await.unwrap();

    let last = repository.last_job_execution("chunkJob").await.unwrap().unwrap();
    assert_eq!(last.run_id, second.run_id);
    assert_eq!(repository.executions_of("chunkJob").len(), 2);

    // terminal history cannot be rewritten
    let mut tampered = first.clone();
    tampered.status = JobStatus::Failed;
    assert!(matches!(
        repository.save_job_execution(&tampered).await,
        Err(RepositoryError::ImmutableExecution(_))
    ));
}

#[tokio::test]
async fn test_stop_request_is_honoured_between_chunks() {
    let (controller, _) = controller();
    let table = student_table();
    let writer = StoppingWriter {
        table: table.clone(),
        stop: controller.stop_handle(),
        after: 2,
    };
    let step = ChunkStep::builder("firstChunkStep")
        .chunk_size(100)
        .cursor(databridge::reader::MemoryCursor::new("student", students(450)))
        .mapper(databridge::mapping::student_mapping())
        .writer(writer)
        .build()
        .unwrap();
    let mut job = JobDefinition::new("chunkJob").step(step);

    let execution = controller.run(&mut job).await.unwrap();

    assert_eq!(execution.status, JobStatus::Failed);
    assert_eq!(table.committed_chunks(), vec![100, 100]);
    let step = &execution.steps[0];
    assert_eq!(step.status, StepStatus::Failed);
    assert_eq!(step.commit_count, 2);
    assert_eq!(step.write_count, 200);
    assert_eq!(step.rollback_count, 0);
    let failure = execution.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::Stopped);
    assert_eq!(failure.chunk_offset, 200);
}

fn stopping_job(
    controller: &JobController,
    table: &MemoryTable,
    records: usize,
    after: usize,
) -> JobDefinition {
    let writer = StoppingWriter {
        table: table.clone(),
        stop: controller.stop_handle(),
        after,
    };
    let step = ChunkStep::builder("firstChunkStep")
        .chunk_size(100)
        .cursor(databridge::reader::MemoryCursor::new("student", students(records)))
        .mapper(databridge::mapping::student_mapping())
        .writer(writer)
        .build()
        .unwrap();
    JobDefinition::new("chunkJob").step(step)
}

#[tokio::test]
async fn test_stop_during_last_full_chunk_still_completes() {
    let (controller, _) = controller();
    let table = student_table();
    let mut job = stopping_job(&controller, &table, 200, 2);

    let execution = controller.run(&mut job).await.unwrap();

    assert_eq!(execution.status, JobStatus::Completed);
    assert_eq!(table.committed_chunks(), vec![100, 100]);
    assert!(execution.failure.is_none());
}

#[tokio::test]
async fn test_stop_request_does_not_carry_into_next_run() {
    let (controller, _) = controller();
    let table = student_table();
    let mut stopped = stopping_job(&controller, &table, 450, 1);

    let first = controller.run(&mut stopped).await.unwrap();
    assert_eq!(first.failure.unwrap().kind, FailureKind::Stopped);

    // a request left over from the previous run
    controller.stop_handle().request_stop();
    let (mut job, other) = StudentJobBuilder::new(students(10)).build();
    let second = controller.run(&mut job).await.unwrap();

    assert_eq!(second.status, JobStatus::Completed);
    assert_eq!(second.write_count(), 10);
    assert_eq!(other.len(), 10);
}

#[tokio::test]
async fn test_restart_reruns_failed_step_from_the_beginning() {
    let (controller, repository) = controller();
    let table = student_table().reject_offset(150);
    let (mut job, table) = StudentJobBuilder::new(students(450))
        .with_table(table)
        .build();

    let failed = controller.run(&mut job).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(table.is_empty());

    table.clear_rejection();
    let restarted = controller.restart(failed.run_id, &mut job).await.unwrap();

    assert_eq!(restarted.status, JobStatus::Completed);
    assert_eq!(restarted.restarted_from, Some(failed.run_id));
    assert_eq!(restarted.write_count(), 450);
    assert_eq!(table.committed_chunks(), vec![200, 200, 50]);

    // the failed run is untouched history
    let original = repository.find_job_execution(failed.run_id).await.unwrap().unwrap();
    assert_eq!(original.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_restart_of_partially_committed_step_hits_existing_rows() {
    let (controller, _) = controller();
    let table = student_table().reject_offset(250);
    let (mut job, table) = StudentJobBuilder::new(students(450))
        .with_table(table)
        .build();

    let failed = controller.run(&mut job).await.unwrap();
    assert_eq!(table.len(), 200);

    table.clear_rejection();
    let restarted = controller.restart(failed.run_id, &mut job).await.unwrap();

    // the first chunk was already committed, so re-reading from record 0 collides
    assert_eq!(restarted.status, JobStatus::Failed);
    let failure = restarted.failure.unwrap();
    assert_eq!(failure.chunk_offset, 0);
    assert_eq!(failure.failing_offset, Some(0));
    assert_eq!(table.len(), 200);
}

#[tokio::test]
async fn test_restart_requires_failed_run_of_same_job() {
    let (controller, _) = controller();
    let (mut job, _) = StudentJobBuilder::new(students(3)).build();
    let done = controller.run(&mut job).await.unwrap();

    assert!(matches!(
        controller.restart(done.run_id, &mut job).await,
        Err(JobError::AlreadyComplete(_))
    ));

    let (step, _) = StudentJobBuilder::new(vec![]).step();
    let mut other = JobDefinition::new("otherJob").step(step);
    assert!(matches!(
        controller.restart(done.run_id, &mut other).await,
        Err(JobError::JobMismatch { .. })
    ));
}
