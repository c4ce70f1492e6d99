mod common;

use common::*;
use databridge::mapping::{student_mapping, RecordMapper};
use databridge::models::{BufferStatus, ChunkBuffer, DestinationRecord, Record};
use databridge::orchestration::{StepExecutor, StopHandle};
use databridge::writer::{to_params, InsertStatement};
use proptest::prelude::*;
use std::num::NonZeroUsize;

proptest! {
    /// Property: every chunk but the last is full; the last holds the remainder
    #[test]
    fn chunk_sizes_follow_commit_interval((records, chunk_size) in chunking_strategy()) {
        let (mut step, table) = StudentJobBuilder::new(students(records))
            .with_chunk_size(chunk_size)
            .step();

        let report = tokio_test::block_on(StepExecutor::new(StopHandle::new().signal()).execute(&mut step));
        prop_assert!(report.is_success());

        let chunks = table.committed_chunks();
        prop_assert_eq!(chunks.len(), records.div_ceil(chunk_size));
        if let Some((last, full)) = chunks.split_last() {
            prop_assert!(full.iter().all(|&size| size == chunk_size));
            let expected_last = if records % chunk_size == 0 { chunk_size } else { records % chunk_size };
            prop_assert_eq!(*last, expected_last);
        }
    }

    /// Property: with no faults, written == read == source size
    #[test]
    fn written_equals_read_without_errors((records, chunk_size) in chunking_strategy()) {
        let (controller, _) = controller();
        let (mut job, table) = StudentJobBuilder::new(students(records))
            .with_chunk_size(chunk_size)
            .build();

        let execution = tokio_test::block_on(controller.run(&mut job)).unwrap();

        prop_assert_eq!(execution.read_count(), records as u64);
        prop_assert_eq!(execution.write_count(), records as u64);
        prop_assert_eq!(table.len(), records);
    }

    /// Property: a rejected chunk leaves the destination as it was before the chunk
    #[test]
    fn failed_chunk_is_never_partially_visible(
        (records, chunk_size) in (1usize..600, 1usize..250),
        reject_seed in any::<prop::sample::Index>(),
    ) {
        let reject = reject_seed.index(records) as u64;
        let (controller, _) = controller();
        let (mut job, table) = StudentJobBuilder::new(students(records))
            .with_chunk_size(chunk_size)
            .with_table(student_table().reject_offset(reject))
            .build();

        let execution = tokio_test::block_on(controller.run(&mut job)).unwrap();

        let failure = execution.failure.unwrap();
        let chunk_start = (reject / chunk_size as u64) * chunk_size as u64;
        prop_assert_eq!(failure.chunk_offset, chunk_start);
        prop_assert_eq!(failure.failing_offset, Some(reject));
        prop_assert_eq!(table.len() as u64, chunk_start);
    }

    /// Property: mapping is a pure function of the source record
    #[test]
    fn mapper_is_deterministic(record in student_record_strategy()) {
        let mapper = student_mapping();
        let first = mapper.map(&record);
        let second = mapper.map(&record);
        prop_assert_eq!(first, second);
    }

    /// Property: bound parameters follow the insert statement's column order
    #[test]
    fn params_follow_column_order(record in student_record_strategy()) {
        let statement = InsertStatement::new("student", databridge::mapping::STUDENT_COLUMNS);
        let mapped = student_mapping().map(&record).unwrap();
        let params = to_params(&mapped, statement.columns()).unwrap();

        prop_assert_eq!(params.len(), 6);
        for (column, param) in statement.columns().iter().zip(&params) {
            prop_assert_eq!(Some(param), mapped.get(column));
        }
    }

    /// Property: the buffer never holds more than its capacity
    #[test]
    fn buffer_never_exceeds_capacity(capacity in 1usize..64, adds in 0usize..256) {
        let mut buffer = ChunkBuffer::new(NonZeroUsize::new(capacity).unwrap());
        for id in 0..adds {
            let record = DestinationRecord(Record::new().with("id", id as i64));
            match buffer.add(record) {
                Ok(BufferStatus::Full) => {
                    prop_assert_eq!(buffer.len(), capacity);
                    prop_assert_eq!(buffer.drain().len(), capacity);
                }
                Ok(BufferStatus::Accepting) => prop_assert!(buffer.len() < capacity),
                Err(_) => prop_assert!(false, "buffer overflowed"),
            }
        }
        prop_assert_eq!(buffer.offset() as usize + buffer.len(), adds);
    }
}
