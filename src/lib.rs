#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Databridge
//!
//! Chunk-oriented extract-transform-load engine that copies records from one
//! relational store to another.
//!
//! ## Overview
//!
//! A job is an ordered list of chunk steps. Each step pulls records from a
//! forward-only [`reader::RecordCursor`], maps them with a
//! [`mapping::RecordMapper`], accumulates them in a fixed-size chunk and hands
//! every full chunk (and the final partial one) to a [`writer::ChunkWriter`]
//! that persists it in exactly one transaction. A chunk is either fully visible
//! in the destination or not at all.
//!
//! ## Module Organization
//!
//! - [`models`] - records, chunks and execution history
//! - [`reader`] - record cursors (Postgres, in-memory)
//! - [`mapping`] - declarative field mapping and the student mapping
//! - [`writer`] - transactional chunk writers (MySQL, in-memory)
//! - [`state_machine`] - step and job lifecycles
//! - [`orchestration`] - step executor, job controller, stop handling
//! - [`repository`] - job execution history
//! - [`database`] - connection pools and job-repository migrations
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - structured logging setup
//! - [`error`] - crate-wide error type
//!
//! ## Quick Start
//!
//! ```rust
//! use databridge::mapping::student_mapping;
//! use databridge::models::{Record, SourceRecord};
//! use databridge::orchestration::{ChunkStep, JobController, JobDefinition};
//! use databridge::reader::MemoryCursor;
//! use databridge::repository::InMemoryJobRepository;
//! use databridge::state_machine::JobStatus;
//! use databridge::writer::MemoryTable;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let students: Vec<SourceRecord> = (0..450)
//!     .map(|id| {
//!         SourceRecord(
//!             Record::new()
//!                 .with("id", id)
//!                 .with("first_name", "Ada")
//!                 .with("last_name", "Lovelace")
//!                 .with("email", "ada@example.edu")
//!                 .with("dept_id", 1)
//!                 .with("is_active", true),
//!         )
//!     })
//!     .collect();
//!
//! let table = MemoryTable::new("student", "id");
//! let step = ChunkStep::builder("firstChunkStep")
//!     .chunk_size(200)
//!     .cursor(MemoryCursor::new("student", students))
//!     .mapper(student_mapping())
//!     .writer(table.clone())
//!     .build()?;
//! let mut job = JobDefinition::new("chunkJob").step(step);
//!
//! let controller = JobController::new(Arc::new(InMemoryJobRepository::new()));
//! let execution = controller.run(&mut job).await?;
//!
//! assert_eq!(execution.status, JobStatus::Completed);
//! assert_eq!(table.committed_chunks(), vec![200, 200, 50]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod models;
pub mod orchestration;
pub mod reader;
pub mod repository;
pub mod state_machine;
pub mod writer;

pub use config::{ConfigManager, DataBridgeConfig, DataSourceConfig, JobConfig};
pub use database::{DataSources, DatabaseMigrations};
pub use error::{DataBridgeError, Result};
pub use mapping::{student_mapping, FieldMapper, FieldRule, MappingError, RecordMapper};
pub use models::{
    Chunk, ChunkBuffer, DestinationRecord, FailureKind, FailureReport, FieldType, FieldValue,
    JobExecution, Record, RunId, SourceRecord, StepExecution,
};
pub use orchestration::{
    ChunkStep, JobController, JobDefinition, JobError, StepError, StepExecutor, StopHandle,
};
pub use reader::{MemoryCursor, PgRecordCursor, RecordCursor, SourceReadError};
pub use repository::{InMemoryJobRepository, JobRepository, PgJobRepository, RepositoryError};
pub use state_machine::{JobStatus, StepStatus};
pub use writer::{ChunkWriter, InsertStatement, MemoryTable, MySqlChunkWriter, WriteError};
