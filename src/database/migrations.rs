//! # Job Repository Migrations
//!
//! Versioned schema for the job-repository database. Migrations are embedded at
//! compile time from `migrations/` (`YYYYMMDDHHMMSS_description.sql`) and
//! applied in version order, each one recorded in `databridge_schema_migrations`.
//!
//! Concurrent processes are serialised with a Postgres advisory lock:
//!
//! ```sql
//! SELECT pg_advisory_lock(4242001)
//! -- apply outstanding migrations
//! SELECT pg_advisory_unlock(4242001)
//! ```
//!
//! Applying is idempotent; a second run finds nothing outstanding.

use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres, Row};
use std::collections::HashSet;
use tracing::info;

const LOCK_KEY: i64 = 4_242_001;

/// A single embedded migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Version timestamp (YYYYMMDDHHMMSS format)
    pub version: &'static str,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: "20250301120000",
    name: "create job repository",
    sql: include_str!("../../migrations/20250301120000_create_job_repository.sql"),
}];

pub struct DatabaseMigrations;

impl DatabaseMigrations {
    /// All known migrations in version order
    pub fn migrations() -> &'static [Migration] {
        MIGRATIONS
    }

    /// Apply every outstanding migration
    pub async fn run_all(pool: &PgPool) -> Result<(), sqlx::Error> {
        // Advisory locks are per session, so lock and unlock on one connection
        let mut conn = pool.acquire().await?;
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(LOCK_KEY)
            .execute(&mut *conn)
            .await?;

        let result = Self::run_outstanding_migrations(&mut conn).await;

        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(LOCK_KEY)
            .execute(&mut *conn)
            .await?;

        result
    }

    async fn run_outstanding_migrations(
        conn: &mut PoolConnection<Postgres>,
    ) -> Result<(), sqlx::Error> {
        Self::ensure_migration_table(conn).await?;
        let applied = Self::get_applied_migrations(conn).await?;

        for migration in MIGRATIONS.iter().filter(|m| !applied.contains(m.version)) {
            info!(version = migration.version, name = migration.name, "applying migration");
            let mut tx = sqlx::Connection::begin(&mut **conn).await?;
            sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO databridge_schema_migrations (version) VALUES ($1)")
                .bind(migration.version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
        }

        Ok(())
    }

    async fn ensure_migration_table(conn: &mut PoolConnection<Postgres>) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS databridge_schema_migrations (
                version VARCHAR(14) PRIMARY KEY,
                applied_at TIMESTAMPTZ DEFAULT NOW()
            )
        "#,
        )
        .execute(&mut **conn)
        .await?;

        Ok(())
    }

    async fn get_applied_migrations(
        conn: &mut PoolConnection<Postgres>,
    ) -> Result<HashSet<String>, sqlx::Error> {
        let rows = sqlx::query("SELECT version FROM databridge_schema_migrations")
            .fetch_all(&mut **conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("version"))
            .collect())
    }
}
