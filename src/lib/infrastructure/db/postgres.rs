//! Postgres module

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

mod dispatch;

/// Database connection
#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    /// The database connection pool
    pub pool: PgPool,
}

impl PostgresDatabase {
    /// Create a new database connection pool and check that it is reachable
    #[mutants::skip]
    pub async fn new(details: &DatabaseConnectionDetails) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(details.max_connections)
            .idle_timeout(Duration::from_secs(details.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(details.max_lifetime_secs))
            .connect(&details.connection_string)
            .await
            .context("failed to connect to the database")?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .context("failed to ping the database")?;

        Ok(Self { pool })
    }

    /// Apply pending schema migrations
    #[mutants::skip]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run database migrations")?;

        info!("database migrations applied");

        Ok(())
    }
}

/// Database connection details
#[derive(Clone, Debug, Parser)]
pub struct DatabaseConnectionDetails {
    /// The database connection string
    #[arg(long, env = "DATABASE_URL")]
    pub connection_string: String,

    /// Maximum number of pooled connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value = "30")]
    pub max_connections: u32,

    /// Seconds an idle connection is kept before being closed
    #[arg(long, env = "DB_IDLE_TIMEOUT_SECS", default_value = "300")]
    pub idle_timeout_secs: u64,

    /// Seconds after which a connection is recycled
    #[arg(long, env = "DB_MAX_LIFETIME_SECS", default_value = "600")]
    pub max_lifetime_secs: u64,
}
