use crate::config::{DataBridgeConfig, DataSourceConfig};
use serde::Serialize;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::{MySqlPool, PgPool, Row};
use tracing::{info, warn};

/// The three stores a databridge run talks to, each behind its own pool
#[derive(Debug, Clone)]
pub struct DataSources {
    source: PgPool,
    destination: MySqlPool,
    job_repository: PgPool,
}

/// Result of probing every data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub source: bool,
    pub destination: bool,
    pub job_repository: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.source && self.destination && self.job_repository
    }
}

impl DataSources {
    pub async fn connect(config: &DataBridgeConfig) -> Result<Self, sqlx::Error> {
        let source = Self::pg_pool(&config.source).await?;
        let destination = MySqlPoolOptions::new()
            .max_connections(config.destination.max_connections)
            .acquire_timeout(config.destination.acquire_timeout())
            .connect(&config.destination.url)
            .await?;
        let job_repository = Self::pg_pool(&config.job_repository).await?;

        info!(
            source_pool = config.source.max_connections,
            destination_pool = config.destination.max_connections,
            job_repository_pool = config.job_repository.max_connections,
            "Connected data sources"
        );

        Ok(Self {
            source,
            destination,
            job_repository,
        })
    }

    async fn pg_pool(config: &DataSourceConfig) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await
    }

    pub fn source(&self) -> &PgPool {
        &self.source
    }

    pub fn destination(&self) -> &MySqlPool {
        &self.destination
    }

    pub fn job_repository(&self) -> &PgPool {
        &self.job_repository
    }

    pub async fn health_check(&self) -> HealthReport {
        let source = Self::ping_pg(&self.source, "source").await;
        let job_repository = Self::ping_pg(&self.job_repository, "job_repository").await;
        let destination = match sqlx::query("SELECT 1 AS health")
            .fetch_one(&self.destination)
            .await
        {
            Ok(row) => row.try_get::<i64, _>("health").map(|h| h == 1).unwrap_or(false),
            Err(e) => {
                warn!(data_source = "destination", error = %e, "health check failed");
                false
            }
        };

        HealthReport {
            source,
            destination,
            job_repository,
        }
    }

    async fn ping_pg(pool: &PgPool, name: &str) -> bool {
        match sqlx::query("SELECT 1 AS health").fetch_one(pool).await {
            Ok(row) => row.try_get::<i32, _>("health").map(|h| h == 1).unwrap_or(false),
            Err(e) => {
                warn!(data_source = name, error = %e, "health check failed");
                false
            }
        }
    }

    /// Close every pool, waiting for checked-out connections to return
    pub async fn close(self) {
        self.source.close().await;
        self.destination.close().await;
        self.job_repository.close().await;
    }
}
