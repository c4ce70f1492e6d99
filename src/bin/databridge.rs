//! # Databridge CLI
//!
//! Runs the student migration job: reads `student` rows from the Postgres
//! source, maps them, and writes them to the MySQL destination in chunks.
//! Execution history is kept in the job-repository database so that a failed
//! run can be restarted by its run id.

use anyhow::Context;
use clap::{Parser, Subcommand};
use databridge::config::ConfigManager;
use databridge::database::DataSources;
use databridge::logging::{init_structured_logging, log_error};
use databridge::mapping::{student_mapping, STUDENT_COLUMNS};
use databridge::models::{JobExecution, RunId};
use databridge::orchestration::{ChunkStep, JobController, JobDefinition};
use databridge::reader::PgRecordCursor;
use databridge::repository::{JobRepository, PgJobRepository};
use databridge::state_machine::JobStatus;
use databridge::writer::{InsertStatement, MySqlChunkWriter};
use databridge::DataBridgeConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "databridge")]
#[command(about = "Copy records between relational stores in transactional chunks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Environment to load (development, test, production); defaults to DATABRIDGE_ENV
    #[arg(short, long)]
    environment: Option<String>,

    /// Directory containing databridge.yaml
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the job under a new run id
    Run,

    /// Re-run a failed execution, carrying over its completed steps
    Restart {
        /// Run id of the failed execution
        run_id: RunId,
    },

    /// Show the most recent execution of the job
    Last,

    /// Probe the source, destination and job-repository databases
    Health,

    /// Load and validate the configuration, printing it with credentials masked
    ValidateConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_structured_logging();

    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .context("failed to load configuration")?;

    if let Commands::ValidateConfig = cli.command {
        println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
        return Ok(ExitCode::SUCCESS);
    }

    let config = manager.config();
    let sources = DataSources::connect(config)
        .await
        .context("failed to connect data sources")?;

    if let Commands::Health = cli.command {
        let report = sources.health_check().await;
        sources.close().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if report.is_healthy() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let result = execute(&cli.command, config, &sources).await;
    sources.close().await;

    match result {
        Ok(Some(execution)) => {
            println!("{}", serde_json::to_string_pretty(&execution)?);
            Ok(if execution.status == JobStatus::Completed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Ok(None) => {
            println!("no executions recorded for job '{}'", config.job.name);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            log_error("cli", "execute", &format!("{e:#}"), None);
            Err(e)
        }
    }
}

async fn execute(
    command: &Commands,
    config: &DataBridgeConfig,
    sources: &DataSources,
) -> anyhow::Result<Option<JobExecution>> {
    let repository = PgJobRepository::new(sources.job_repository().clone());
    repository
        .migrate()
        .await
        .context("failed to migrate job repository")?;

    if let Commands::Last = command {
        return Ok(repository.last_job_execution(&config.job.name).await?);
    }

    let controller = JobController::new(Arc::new(repository));
    let stop = controller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current chunk");
            stop.request_stop();
        }
    });

    let mut job = student_job(config, sources)?;
    let execution = match command {
        Commands::Restart { run_id } => controller.restart(*run_id, &mut job).await?,
        _ => controller.run(&mut job).await?,
    };

    info!(
        run_id = %execution.run_id,
        status = %execution.status,
        read = execution.read_count(),
        written = execution.write_count(),
        "job execution finished"
    );
    Ok(Some(execution))
}

fn student_job(config: &DataBridgeConfig, sources: &DataSources) -> anyhow::Result<JobDefinition> {
    let cursor = PgRecordCursor::new(sources.source().clone())
        .with_name("postgres:source")
        .with_query(config.job.source_query.clone())
        .with_fetch_buffer(config.job.fetch_buffer);
    let writer = MySqlChunkWriter::new(
        sources.destination().clone(),
        InsertStatement::new(config.job.destination_table.clone(), STUDENT_COLUMNS),
    );

    let step = ChunkStep::builder(config.job.step_name.clone())
        .chunk_size(config.job.chunk_size)
        .cursor(cursor)
        .mapper(student_mapping())
        .writer(writer)
        .build()?;

    Ok(JobDefinition::new(config.job.name.clone()).step(step))
}
