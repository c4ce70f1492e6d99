//! # Execution history
//!
//! `JobExecution` and `StepExecution` are the records returned to callers and
//! saved in the job repository. Once a job execution reaches a terminal status
//! it is history: a restart produces a new execution with a new `RunId`.

use crate::state_machine::{JobStatus, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique token identifying one job execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RunId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Category of the fault that failed a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SourceRead,
    Mapping,
    Write,
    Stopped,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceRead => write!(f, "source_read"),
            Self::Mapping => write!(f, "mapping"),
            Self::Write => write!(f, "write"),
            Self::Stopped => write!(f, "stopped"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl std::str::FromStr for FailureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source_read" => Ok(Self::SourceRead),
            "mapping" => Ok(Self::Mapping),
            "write" => Ok(Self::Write),
            "stopped" => Ok(Self::Stopped),
            "internal" => Ok(Self::Internal),
            _ => Err(format!("Invalid failure kind: {s}")),
        }
    }
}

/// Diagnostic attached to a failed step and to its job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub step_name: String,
    pub kind: FailureKind,
    pub message: String,
    /// Source offset of the chunk in flight when the failure occurred
    pub chunk_offset: u64,
    /// Records of that chunk attempted before the failure
    pub chunk_size: usize,
    /// Absolute source position of the offending record, when known
    pub failing_offset: Option<u64>,
}

/// Execution record of one chunk step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepExecution {
    pub step_name: String,
    pub status: StepStatus,
    pub read_count: u64,
    pub write_count: u64,
    /// Chunks committed to the destination
    pub commit_count: u64,
    /// Chunks rolled back (zero or one, since a failed chunk ends the step)
    pub rollback_count: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub failure: Option<FailureReport>,
}

impl StepExecution {
    pub fn new(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            status: StepStatus::Pending,
            read_count: 0,
            write_count: 0,
            commit_count: 0,
            rollback_count: 0,
            started_at: None,
            ended_at: None,
            failure: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

/// Execution record of one job run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecution {
    pub run_id: RunId,
    pub job_name: String,
    pub status: JobStatus,
    pub steps: Vec<StepExecution>,
    /// Run this execution restarted, if any
    pub restarted_from: Option<RunId>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub failure: Option<FailureReport>,
}

impl JobExecution {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            job_name: job_name.into(),
            status: JobStatus::Starting,
            steps: Vec::new(),
            restarted_from: None,
            started_at: Utc::now(),
            ended_at: None,
            failure: None,
        }
    }

    pub fn read_count(&self) -> u64 {
        self.steps.iter().map(|s| s.read_count).sum()
    }

    pub fn write_count(&self) -> u64 {
        self.steps.iter().map(|s| s.write_count).sum()
    }

    pub fn step(&self, name: &str) -> Option<&StepExecution> {
        self.steps.iter().find(|s| s.step_name == name)
    }

    /// First failed step, the one whose error the job reports
    pub fn failed_step(&self) -> Option<&StepExecution> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    /// Status implied by the step executions: completed only when every
    /// expected step completed.
    pub fn derive_status(&self, expected_steps: usize) -> JobStatus {
        let completed = self.steps.iter().filter(|s| s.is_completed()).count();
        if completed == expected_steps && self.steps.len() == expected_steps {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
