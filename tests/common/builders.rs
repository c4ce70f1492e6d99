//! Test data builders for chunk-processing tests

#![allow(dead_code)]

use databridge::mapping::student_mapping;
use databridge::models::{Record, SourceRecord};
use databridge::orchestration::{ChunkStep, JobController, JobDefinition};
use databridge::reader::MemoryCursor;
use databridge::repository::InMemoryJobRepository;
use databridge::writer::MemoryTable;
use std::sync::Arc;

/// Source row shaped like the `student` table
pub fn student(id: i64) -> SourceRecord {
    SourceRecord(
        Record::new()
            .with("id", id)
            .with("first_name", format!("First{id}"))
            .with("last_name", format!("Last{id}"))
            .with("email", format!("student{id}@example.edu"))
            .with("dept_id", 1 + id % 5)
            .with("is_active", id % 3 != 0),
    )
}

pub fn students(count: usize) -> Vec<SourceRecord> {
    (0..count as i64).map(student).collect()
}

pub fn student_table() -> MemoryTable {
    MemoryTable::new("student", "id")
}

/// Builder for a single-step student copy job over in-memory stores
pub struct StudentJobBuilder {
    job_name: String,
    step_name: String,
    chunk_size: usize,
    cursor: MemoryCursor,
    table: MemoryTable,
}

impl StudentJobBuilder {
    pub fn new(records: Vec<SourceRecord>) -> Self {
        Self {
            job_name: "chunkJob".to_string(),
            step_name: "firstChunkStep".to_string(),
            chunk_size: 200,
            cursor: MemoryCursor::new("student", records),
            table: student_table(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_cursor(mut self, cursor: MemoryCursor) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_table(mut self, table: MemoryTable) -> Self {
        self.table = table;
        self
    }

    pub fn step(self) -> (ChunkStep, MemoryTable) {
        let step = ChunkStep::builder(self.step_name)
            .chunk_size(self.chunk_size)
            .cursor(self.cursor)
            .mapper(student_mapping())
            .writer(self.table.clone())
            .build()
            .expect("valid step");
        (step, self.table)
    }

    pub fn build(self) -> (JobDefinition, MemoryTable) {
        let job_name = self.job_name.clone();
        let (step, table) = self.step();
        (JobDefinition::new(job_name).step(step), table)
    }
}

pub fn controller() -> (JobController, InMemoryJobRepository) {
    let repository = InMemoryJobRepository::new();
    (JobController::new(Arc::new(repository.clone())), repository)
}
