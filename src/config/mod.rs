//! # Databridge Configuration
//!
//! YAML configuration with environment sections, mirroring the layout of
//! `config/databridge.yaml`:
//!
//! ```yaml
//! source:          { url: ..., max_connections: 5 }
//! destination:     { url: ..., max_connections: 5 }
//! job_repository:  { url: ... }
//! job:             { name: chunkJob, step_name: firstChunkStep, chunk_size: 200 }
//!
//! production:
//!   source: { url: "${SOURCE_DATABASE_URL}" }
//! ```
//!
//! The section matching the active environment is deep-merged over the base
//! document, `${VAR}` placeholders are expanded, and `DATABRIDGE__SECTION__KEY`
//! variables override individual values.
//!
//! ```rust,no_run
//! use databridge::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let chunk_size = manager.config().job.chunk_size;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring databridge.yaml
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataBridgeConfig {
    /// Environment the configuration was resolved for
    #[serde(default)]
    pub environment: String,

    /// Store the records are read from (Postgres)
    pub source: DataSourceConfig,

    /// Store the records are written to (MySQL)
    pub destination: DataSourceConfig,

    /// Store holding job execution history (Postgres)
    pub job_repository: DataSourceConfig,

    #[serde(default)]
    pub job: JobConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataSourceConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
}

impl DataSourceConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JobConfig {
    pub name: String,
    pub step_name: String,
    /// Records per chunk, committed in one destination transaction
    pub chunk_size: usize,
    /// Rows buffered ahead of the step by the source cursor
    pub fetch_buffer: usize,
    pub source_query: String,
    pub destination_table: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: "chunkJob".to_string(),
            step_name: "firstChunkStep".to_string(),
            chunk_size: crate::orchestration::DEFAULT_CHUNK_SIZE,
            fetch_buffer: crate::reader::postgres::DEFAULT_FETCH_BUFFER,
            source_query: crate::reader::postgres::DEFAULT_SOURCE_QUERY.to_string(),
            destination_table: "student".to_string(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_seconds() -> u64 {
    30
}

impl DataBridgeConfig {
    /// Validate configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (section, source) in [
            ("source", &self.source),
            ("destination", &self.destination),
            ("job_repository", &self.job_repository),
        ] {
            if source.url.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    format!("{section}.url"),
                    format!("{section} configuration"),
                ));
            }
            if source.max_connections == 0 {
                return Err(ConfigurationError::invalid_value(
                    format!("{section}.max_connections"),
                    "0",
                    "pool size must be greater than 0",
                ));
            }
        }

        if self.job.chunk_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "job.chunk_size",
                "0",
                "chunk size must be greater than 0",
            ));
        }

        if self.job.fetch_buffer == 0 {
            return Err(ConfigurationError::invalid_value(
                "job.fetch_buffer",
                "0",
                "fetch buffer must be greater than 0",
            ));
        }

        for (field, value) in [
            ("job.name", &self.job.name),
            ("job.step_name", &self.job.step_name),
            ("job.source_query", &self.job.source_query),
            ("job.destination_table", &self.job.destination_table),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(field, "job configuration"));
            }
        }

        Ok(())
    }
}
