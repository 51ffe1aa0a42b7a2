//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::db::{CaseStore, Stores, UserStore};
use crate::inference::{InferenceClient, InferenceError};
use crate::services::auth::{AuthService, TokenIssuer};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Everything inside is
/// immutable after startup; the stores do their own locking.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GatewayConfig,
    users: Arc<dyn UserStore>,
    cases: Arc<dyn CaseStore>,
    tokens: TokenIssuer,
    inference: InferenceClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Gateway configuration
    /// * `stores` - Credential and Case stores (`PostgreSQL` or in-memory)
    ///
    /// # Errors
    ///
    /// Returns an error if the Inference Service client cannot be built.
    pub fn new(config: GatewayConfig, stores: Stores) -> Result<Self, InferenceError> {
        let inference = InferenceClient::new(&config.inference)?;
        let tokens = TokenIssuer::new(&config.auth.token_secret, config.auth.token_ttl);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                users: stores.users,
                cases: stores.cases,
                tokens,
                inference,
            }),
        })
    }

    /// Get a reference to the gateway configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Get a reference to the Credential Store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    /// Get a reference to the Case Store.
    #[must_use]
    pub fn cases(&self) -> &dyn CaseStore {
        self.inner.cases.as_ref()
    }

    /// Get a reference to the token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Get a reference to the Inference Service client.
    #[must_use]
    pub fn inference(&self) -> &InferenceClient {
        &self.inner.inference
    }

    /// Authentication service borrowing this state's stores.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.users(), self.tokens())
    }
}
