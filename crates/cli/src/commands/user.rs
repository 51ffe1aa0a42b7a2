//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! forensight-cli user create -e investigator@example.com -p 'long passphrase'
//! ```
//!
//! Goes through the same registration path as `POST /auth/signup`, so the
//! email is normalized and the password hashed exactly as the gateway does.

use forensight_core::UserId;
use forensight_gateway::config::{ConfigError, GatewayConfig};
use forensight_gateway::db::{self, PgUserStore};
use forensight_gateway::services::auth::{AuthError, AuthService, TokenIssuer};
use thiserror::Error;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing environment variable: GATEWAY_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Create a user account.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(email: &str, password: &str) -> Result<UserId, UserError> {
    let config = GatewayConfig::from_env()?;
    let database_url = config
        .database_url
        .as_ref()
        .ok_or(UserError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to gateway database...");
    let pool = db::create_pool(database_url).await?;
    let users = PgUserStore::new(pool);
    let tokens = TokenIssuer::new(&config.auth.token_secret, config.auth.token_ttl);

    let user = AuthService::new(&users, &tokens)
        .register(email, password)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}
