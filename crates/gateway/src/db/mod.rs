//! Persistence for the gateway.
//!
//! # Database: `forensight`
//!
//! ## Tables
//!
//! - `users` - Credential Store (email + Argon2 password hash)
//! - `cases` - Cases owned by a user
//! - `case_analyzed_images` - SHA-256 digests of images analyzed for a case
//!
//! Evidence images themselves are never persisted.
//!
//! When no database URL is configured the gateway falls back to the
//! in-memory stores in [`memory`], which are also what the tests use.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/gateway/migrations/` and run via:
//! ```bash
//! cargo run -p forensight-cli -- migrate
//! ```

pub mod cases;
pub mod memory;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use cases::{CaseStore, PgCaseStore};
pub use memory::{MemoryCaseStore, MemoryUserStore};
pub use users::{PgUserStore, UserStore};

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a sqlx error, turning unique violations into [`RepositoryError::Conflict`].
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// The pair of stores the application state is built from.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub cases: Arc<dyn CaseStore>,
}

impl Stores {
    /// Stores backed by a `PostgreSQL` pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            cases: Arc::new(PgCaseStore::new(pool)),
        }
    }

    /// Process-local stores; contents are lost on restart.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::default()),
            cases: Arc::new(MemoryCaseStore::default()),
        }
    }
}
