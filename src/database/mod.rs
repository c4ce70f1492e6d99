//! # Database Operations
//!
//! Connection pools for the source, destination and job-repository stores, and
//! the migration system for the job-repository schema.
//!
//! - [`connection`] - `DataSources`: one pool per store, explicit lifetime
//! - [`migrations`] - embedded, versioned migrations with an advisory lock
//!
//! ```rust,no_run
//! use databridge::config::ConfigManager;
//! use databridge::database::{DataSources, DatabaseMigrations};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let sources = DataSources::connect(manager.config()).await?;
//! DatabaseMigrations::run_all(sources.job_repository()).await?;
//! sources.close().await;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod migrations;

pub use connection::{DataSources, HealthReport};
pub use migrations::{DatabaseMigrations, Migration};
