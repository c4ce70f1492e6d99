//! End-to-end chunk processing over in-memory stores

mod common;

use common::*;
use databridge::models::{DestinationRecord, FailureKind, Record};
use databridge::orchestration::{StepError, StepExecutor, StopHandle};
use databridge::reader::{MemoryCursor, SourceReadError};
use databridge::state_machine::{JobStatus, StepStatus};
use databridge::writer::WriteError;

#[tokio::test]
async fn test_450_records_in_chunks_of_200() {
    let (controller, _) = controller();
    let (mut job, table) = StudentJobBuilder::new(students(450)).build();

    let execution = controller.run(&mut job).await.unwrap();

    assert_eq!(execution.status, JobStatus::Completed);
    assert_eq!(execution.read_count(), 450);
    assert_eq!(execution.write_count(), 450);
    assert_eq!(table.committed_chunks(), vec![200, 200, 50]);
    assert_eq!(execution.steps[0].commit_count, 3);
    assert_eq!(execution.steps[0].rollback_count, 0);
}

#[tokio::test]
async fn test_rejected_record_rolls_back_whole_chunk() {
    let (controller, _) = controller();
    let table = student_table().reject_offset(150);
    let (mut job, table) = StudentJobBuilder::new(students(200)).with_table(table).build();

    let execution = controller.run(&mut job).await.unwrap();

    assert_eq!(execution.status, JobStatus::Failed);
    assert_eq!(table.len(), 0);
    assert_eq!(execution.write_count(), 0);

    let failure = execution.failure.expect("failure report");
    assert_eq!(failure.step_name, "firstChunkStep");
    assert_eq!(failure.kind, FailureKind::Write);
    assert_eq!(failure.chunk_offset, 0);
    assert_eq!(failure.chunk_size, 200);
    assert_eq!(failure.failing_offset, Some(150));
    assert_eq!(execution.steps[0].rollback_count, 1);
}

#[tokio::test]
async fn test_duplicate_key_in_later_chunk_keeps_earlier_chunks() {
    let (controller, _) = controller();
    let table = student_table();
    // a pre-existing row with the id of source record 250 collides in the second chunk
    table.insert_existing(DestinationRecord(Record::new().with("id", 250)));
    let (mut job, table) = StudentJobBuilder::new(students(450)).with_table(table).build();

    let execution = controller.run(&mut job).await.unwrap();

    assert_eq!(execution.status, JobStatus::Failed);
    assert_eq!(table.committed_chunks(), vec![200]);
    assert_eq!(table.len(), 201);
    let failure = execution.failure.unwrap();
    assert_eq!(failure.chunk_offset, 200);
    assert_eq!(failure.failing_offset, Some(250));
}

#[tokio::test]
async fn test_empty_source_completes_without_writes() {
    let (controller, _) = controller();
    let (mut job, table) = StudentJobBuilder::new(vec![]).build();

    let execution = controller.run(&mut job).await.unwrap();

    assert_eq!(execution.status, JobStatus::Completed);
    assert_eq!(execution.write_count(), 0);
    assert_eq!(table.write_calls(), 0);
}

#[tokio::test]
async fn test_exact_multiple_has_no_trailing_chunk() {
    let (controller, _) = controller();
    let (mut job, table) = StudentJobBuilder::new(students(400)).build();

    controller.run(&mut job).await.unwrap();

    assert_eq!(table.committed_chunks(), vec![200, 200]);
    assert_eq!(table.write_calls(), 2);
}

#[tokio::test]
async fn test_source_failure_reports_chunk_in_flight() {
    let cursor = MemoryCursor::new("student", students(450))
        .fail_at(
            321,
            SourceReadError::MalformedRow {
                offset: 321,
                reason: "unsupported column type NUMERIC".to_string(),
            },
        );
    let (mut step, table) = StudentJobBuilder::new(vec![]).with_cursor(cursor).step();

    let report = StepExecutor::new(StopHandle::new().signal())
        .execute(&mut step)
        .await;

    assert_eq!(report.execution.status, StepStatus::Failed);
    assert_eq!(report.execution.read_count, 321);
    assert_eq!(report.execution.write_count, 200);
    assert_eq!(table.len(), 200);
    let error = report.error.unwrap();
    assert!(matches!(error, StepError::SourceRead { .. }));
    assert_eq!(error.chunk_offset(), 200);
    assert_eq!(error.attempted(), 121);
    assert_eq!(error.failing_offset(), Some(321));
}

#[tokio::test]
async fn test_mapping_failure_is_not_skipped() {
    let mut rows = students(10);
    rows[4].0.set("dept_id", "engineering");
    let (mut step, table) = StudentJobBuilder::new(rows).with_chunk_size(3).step();

    let report = StepExecutor::new(StopHandle::new().signal())
        .execute(&mut step)
        .await;

    let failure = report.execution.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::Mapping);
    assert_eq!(failure.chunk_offset, 3);
    assert_eq!(failure.chunk_size, 2);
    assert_eq!(failure.failing_offset, Some(4));
    assert_eq!(table.committed_chunks(), vec![3]);
}

#[test]
fn test_write_error_positions() {
    let chunk = databridge::models::Chunk::new(400, vec![DestinationRecord::default(); 50]);
    let error = WriteError::statement(&chunk, 7, "Duplicate entry");
    assert_eq!(error.chunk_offset(), 400);
    assert_eq!(error.chunk_size(), 50);
    assert_eq!(error.failing_offset(), Some(407));
}
