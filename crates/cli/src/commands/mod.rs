//! CLI subcommand implementations.

pub mod migrate;
pub mod token;
pub mod user;

use secrecy::SecretString;

/// Database URL for the gateway's database.
///
/// Reads `GATEWAY_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    ["GATEWAY_DATABASE_URL", "DATABASE_URL"]
        .into_iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
        .map(SecretString::from)
}
