//! # Job Definitions
//!
//! Explicit composition of jobs from concrete components: a `ChunkStep` owns
//! its cursor, mapper and writer, and a `JobDefinition` is an ordered list of
//! steps. Nothing is resolved implicitly.

use super::errors::{JobError, JobResult};
use crate::mapping::RecordMapper;
use crate::reader::RecordCursor;
use crate::writer::ChunkWriter;
use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// One read-map-write stage of a job
pub struct ChunkStep {
    name: String,
    chunk_size: NonZeroUsize,
    pub(crate) cursor: Box<dyn RecordCursor>,
    pub(crate) mapper: Arc<dyn RecordMapper>,
    pub(crate) writer: Arc<dyn ChunkWriter>,
}

impl ChunkStep {
    pub fn builder(name: impl Into<String>) -> ChunkStepBuilder {
        ChunkStepBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }
}

impl fmt::Debug for ChunkStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkStep")
            .field("name", &self.name)
            .field("chunk_size", &self.chunk_size)
            .field("cursor", &self.cursor.name())
            .field("writer", &self.writer.name())
            .finish()
    }
}

/// Builder for [`ChunkStep`]; every component is required
pub struct ChunkStepBuilder {
    name: String,
    chunk_size: usize,
    cursor: Option<Box<dyn RecordCursor>>,
    mapper: Option<Arc<dyn RecordMapper>>,
    writer: Option<Arc<dyn ChunkWriter>>,
}

impl ChunkStepBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            cursor: None,
            mapper: None,
            writer: None,
        }
    }

    /// Commit interval: records per chunk
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn cursor(mut self, cursor: impl RecordCursor + 'static) -> Self {
        self.cursor = Some(Box::new(cursor));
        self
    }

    pub fn mapper(mut self, mapper: impl RecordMapper + 'static) -> Self {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    pub fn writer(mut self, writer: impl ChunkWriter + 'static) -> Self {
        self.writer = Some(Arc::new(writer));
        self
    }

    pub fn build(self) -> JobResult<ChunkStep> {
        if self.name.trim().is_empty() {
            return Err(JobError::InvalidDefinition("step name must not be empty".into()));
        }
        let chunk_size = NonZeroUsize::new(self.chunk_size).ok_or_else(|| {
            JobError::InvalidDefinition(format!("step '{}': chunk size must be at least 1", self.name))
        })?;
        let missing = |part: &str| {
            JobError::InvalidDefinition(format!("step '{}' has no {part}", self.name))
        };

        let cursor = self.cursor.ok_or_else(|| missing("cursor"))?;
        let mapper = self.mapper.ok_or_else(|| missing("mapper"))?;
        let writer = self.writer.ok_or_else(|| missing("writer"))?;

        Ok(ChunkStep {
            name: self.name,
            chunk_size,
            cursor,
            mapper,
            writer,
        })
    }
}

/// Ordered sequence of steps executed as one logical run
#[derive(Debug)]
pub struct JobDefinition {
    name: String,
    steps: Vec<ChunkStep>,
}

impl JobDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: ChunkStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[ChunkStep] {
        &self.steps
    }

    pub(crate) fn steps_mut(&mut self) -> &mut [ChunkStep] {
        &mut self.steps
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(ChunkStep::name).collect()
    }

    /// At least one step, and step names unique within the job
    pub fn validate(&self) -> JobResult<()> {
        if self.steps.is_empty() {
            return Err(JobError::InvalidDefinition(format!(
                "job '{}' has no steps",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name()) {
                return Err(JobError::InvalidDefinition(format!(
                    "job '{}' declares step '{}' more than once",
                    self.name,
                    step.name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::student_mapping;
    use crate::reader::MemoryCursor;
    use crate::writer::MemoryTable;

    fn step(name: &str, chunk_size: usize) -> JobResult<ChunkStep> {
        ChunkStep::builder(name)
            .chunk_size(chunk_size)
            .cursor(MemoryCursor::new("src", vec![]))
            .mapper(student_mapping())
            .writer(MemoryTable::new("student", "id"))
            .build()
    }

    #[test]
    fn test_builder_defaults_to_200() {
        let step = step("copy", DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(step.chunk_size().get(), 200);
        assert_eq!(step.name(), "copy");
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        assert!(matches!(step("copy", 0), Err(JobError::InvalidDefinition(_))));
    }

    #[test]
    fn test_missing_writer_is_rejected() {
        let result = ChunkStep::builder("copy")
            .cursor(MemoryCursor::new("src", vec![]))
            .mapper(student_mapping())
            .build();
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Invalid job definition: step 'copy' has no writer");
    }

    #[test]
    fn test_job_validation() {
        assert!(JobDefinition::new("empty").validate().is_err());

        let dup = JobDefinition::new("dup")
            .step(step("a", 10).unwrap())
            .step(step("a", 10).unwrap());
        assert!(dup.validate().is_err());

        let ok = JobDefinition::new("ok")
            .step(step("a", 10).unwrap())
            .step(step("b", 10).unwrap());
        ok.validate().unwrap();
        assert_eq!(ok.step_names(), vec!["a", "b"]);
    }
}
