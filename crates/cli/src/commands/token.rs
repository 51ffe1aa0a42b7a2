//! Bearer token inspection.
//!
//! # Usage
//!
//! ```bash
//! forensight-cli token verify <TOKEN>
//! ```
//!
//! Uses `GATEWAY_TOKEN_SECRET` from the environment, so it answers the same
//! way the running gateway would.

use forensight_gateway::config::{ConfigError, GatewayConfig};
use forensight_gateway::services::auth::{AuthError, Claims, TokenIssuer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Verify a token and log its claims.
pub fn verify(token: &str) -> Result<Claims, TokenError> {
    let config = GatewayConfig::from_env()?;
    let tokens = TokenIssuer::new(&config.auth.token_secret, config.auth.token_ttl);

    let claims = tokens.verify(token.trim())?;
    tracing::info!("Token is valid");
    tracing::info!("  User ID: {}", claims.sub);
    tracing::info!("  Email: {}", claims.email);
    tracing::info!("  Issued at: {}", claims.iat);
    tracing::info!("  Expires at: {}", claims.exp);
    Ok(claims)
}
