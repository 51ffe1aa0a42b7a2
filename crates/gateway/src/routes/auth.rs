//! Authentication route handlers.
//!
//! Signup and signin take a JSON body `{email, password}`. Failures use the
//! `message` key, matching what the frontend session reads.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::PublicUser;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Signup and signin request body.
///
/// Fields default to empty so a missing field is reported the same way as
/// a blank one.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsRequest {
    fn is_incomplete(&self) -> bool {
        self.email.trim().is_empty() || self.password.is_empty()
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct SigninResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub id: forensight_core::UserId,
    pub email: String,
}

/// Register a new user.
#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload?;
    if request.is_incomplete() {
        return Err(AuthError::MissingCredentials.into());
    }

    state
        .auth()
        .register(&request.email, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully",
        }),
    ))
}

/// Sign in and receive a bearer token.
///
/// A blank field is answered like a wrong password.
#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<SigninResponse>> {
    let Json(request) = payload?;
    if request.is_incomplete() {
        return Err(AuthError::InvalidCredentials.into());
    }

    let (user, issued) = state
        .auth()
        .authenticate(&request.email, &request.password)
        .await?;

    Ok(Json(SigninResponse {
        token: issued.token,
        user: PublicUser::from(&user),
    }))
}

/// The caller's account, looked up from the token's user id.
///
/// A validly signed token for an account that no longer exists is refused.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<MeResponse>> {
    let user = state
        .users()
        .get_by_id(caller.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email.to_string(),
    }))
}
