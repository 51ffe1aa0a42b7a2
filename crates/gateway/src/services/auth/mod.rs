//! Authentication service.
//!
//! Password signup/signin over the Credential Store plus bearer token
//! issuance.

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, IssuedToken, TokenIssuer};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use forensight_core::Email;

use crate::db::{RepositoryError, UserStore};
use crate::models::User;

/// Authentication service.
///
/// Borrowed from [`crate::state::AppState`] per request.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    tokens: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, tokens: &'a TokenIssuer) -> Self {
        Self { users, tokens }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is empty.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Sign in with email and password and issue a bearer token.
    ///
    /// A malformed email, an unknown email, and a wrong password all yield
    /// the same `InvalidCredentials` error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, IssuedToken), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .find_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.tokens.issue(&user)?;
        tracing::info!(user_id = %user.id, "User signed in");
        Ok((user, token))
    }

    /// Verify a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is not valid.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.verify(token)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::WeakPassword(
            "password cannot be empty".to_owned(),
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::db::MemoryUserStore;

    fn tokens() -> TokenIssuer {
        TokenIssuer::new(
            &SecretString::from("k8#Pq2!vLz9@Rm4$Tx7&Wn1^Yb6*Hc3%"),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let users = MemoryUserStore::default();
        let tokens = tokens();
        let auth = AuthService::new(&users, &tokens);

        let registered = auth.register("a@b.com", "x").await.unwrap();
        let (user, issued) = auth.authenticate("a@b.com", "x").await.unwrap();

        assert_eq!(user.id, registered.id);
        let claims = auth.verify_token(&issued.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), registered.id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let users = MemoryUserStore::default();
        let tokens = tokens();
        AuthService::new(&users, &tokens)
            .register("hash@lab.org", "plain-text")
            .await
            .unwrap();

        let (_, stored) = users
            .find_credentials(&Email::parse("hash@lab.org").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored, "plain-text");
        assert!(stored.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let users = MemoryUserStore::default();
        let tokens = tokens();
        let auth = AuthService::new(&users, &tokens);

        auth.register("a@b.com", "x").await.unwrap();
        let err = auth.register("a@b.com", "y").await.unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));

        // the original password still works
        assert!(auth.authenticate("a@b.com", "x").await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
        let users = MemoryUserStore::default();
        let tokens = tokens();
        let auth = AuthService::new(&users, &tokens);
        auth.register("a@b.com", "x").await.unwrap();

        let wrong_password = auth.authenticate("a@b.com", "nope").await.unwrap_err();
        let unknown_email = auth.authenticate("who@b.com", "x").await.unwrap_err();
        let malformed = auth.authenticate("not-an-email", "x").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert!(matches!(malformed, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let users = MemoryUserStore::default();
        let tokens = tokens();
        let auth = AuthService::new(&users, &tokens);

        assert!(matches!(
            auth.register("no-at-symbol", "x").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register("a@b.com", "").await,
            Err(AuthError::WeakPassword(_))
        ));
    }
}
