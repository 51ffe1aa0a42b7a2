//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Bodies are JSON. Auth failures use the key `message`, everything else uses
//! `error`. Internal details never reach the client; when development mode is
//! on, [`crate::middleware::error_details`] adds them back under `details`.

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{BytesRejection, JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::inference::InferenceError;
use crate::services::auth::AuthError;

/// Application-level error type for the gateway.
#[derive(Debug, Error)]
pub enum AppError {
    /// Required field or file missing from the request.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request body could not be read or decoded.
    #[error("Rejected request body: {message}")]
    Rejected {
        /// Status chosen by the extractor (400, 413, 415, 422).
        status: StatusCode,
        /// Extractor's description of the problem.
        message: String,
    },

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Missing or invalid bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (or not owned by the caller).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Inference Service call failed before a response could be relayed.
    #[error("Inference relay failed: {source}")]
    Upstream {
        /// Sanitized, route-specific message for the client.
        message: &'static str,
        /// Underlying client error.
        #[source]
        source: InferenceError,
    },

    /// Store operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Internal error text attached to error responses as an extension.
///
/// Only surfaced to clients by the development-mode middleware.
#[derive(Debug, Clone)]
pub struct ErrorDetails(pub String);

impl AppError {
    /// Wrap an Inference Service failure with the message the client sees.
    #[must_use]
    pub const fn upstream(message: &'static str, source: InferenceError) -> Self {
        Self::Upstream { message, source }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::Auth(err) => match err {
                AuthError::MissingCredentials
                | AuthError::InvalidCredentials
                | AuthError::UserAlreadyExists
                | AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::TokenSigning(_)
                | AuthError::Repository(_)
                | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { .. } | Self::Repository(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-safe message and the JSON key it is sent under.
    fn public_message(&self) -> (&'static str, String) {
        match self {
            Self::Auth(err) => {
                let message = match err {
                    AuthError::MissingCredentials => "Email and password required".to_string(),
                    AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                    AuthError::UserAlreadyExists => "User already exists".to_string(),
                    AuthError::WeakPassword(msg) => msg.clone(),
                    AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                    AuthError::InvalidToken => "Invalid or expired token".to_string(),
                    AuthError::TokenSigning(_)
                    | AuthError::Repository(_)
                    | AuthError::PasswordHash => "Server error".to_string(),
                };
                ("message", message)
            }
            Self::Validation(msg) | Self::Unauthorized(msg) | Self::NotFound(msg) => {
                ("error", msg.clone())
            }
            Self::Rejected { message, .. } => ("error", message.clone()),
            Self::Upstream { message, .. } => ("error", (*message).to_string()),
            Self::Repository(_) | Self::Internal(_) => {
                ("error", "Internal server error".to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::Rejected {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        // Don't expose internal error details to clients
        let (key, message) = self.public_message();
        let mut response = (status, Json(serde_json::json!({ key: message }))).into_response();
        response
            .extensions_mut()
            .insert(ErrorDetails(self.to_string()));
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the auth extractor so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for relay activity.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of calls
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
