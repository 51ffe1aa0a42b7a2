//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! forensight-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `GATEWAY_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Gateway migrations live in `crates/gateway/migrations/`:
//! ```text
//! migrations/
//! ├── 20261019000001_create_users.sql
//! └── 20261019000002_create_cases.sql
//! ```

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: GATEWAY_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the gateway database migrations.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = super::database_url().ok_or(MigrationError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to gateway database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running gateway migrations...");
    sqlx::migrate!("../gateway/migrations").run(&pool).await?;

    tracing::info!("Gateway migrations complete!");
    Ok(())
}
