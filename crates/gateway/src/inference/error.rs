//! Error types for the Inference Service client.

use thiserror::Error;

/// Longest upstream error body kept for logs.
const MAX_ERROR_BODY: usize = 512;

/// Errors that can occur when talking to the Inference Service.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Connection, timeout, or body transfer failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("inference service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// An endpoint path could not be joined onto the base URL.
    #[error("invalid inference URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The service answered 2xx with a body that is not JSON.
    #[error("parse error: {0}")]
    Parse(String),
}

impl InferenceError {
    pub(crate) fn status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = match body.char_indices().nth(MAX_ERROR_BODY) {
            Some((cut, _)) => format!("{}...", body.get(..cut).unwrap_or(body)),
            None => body.to_owned(),
        };
        Self::Status {
            status: status.as_u16(),
            body,
        }
    }
}
