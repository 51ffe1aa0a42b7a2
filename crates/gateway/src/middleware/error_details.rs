//! Development-mode error details.
//!
//! `AppError` responses carry their internal error text in an
//! [`ErrorDetails`] extension. In development this middleware copies it into
//! the JSON body as `details`; in production the extension is dropped.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::Response,
};

use crate::error::ErrorDetails;
use crate::state::AppState;

/// Error bodies are small; anything larger is passed through untouched.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Add `details` to error bodies when running in development mode.
pub async fn error_details_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let details = response.extensions_mut().remove::<ErrorDetails>();

    let Some(ErrorDetails(details)) = details else {
        return response;
    };
    if !state.config().environment.exposes_error_details() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let Ok(bytes) = to_bytes(body, MAX_ERROR_BODY).await else {
        return Response::from_parts(parts, Body::empty());
    };

    let body = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(serde_json::Value::Object(mut map)) => {
            map.insert("details".to_string(), serde_json::Value::String(details));
            parts.headers.remove(CONTENT_LENGTH);
            Body::from(serde_json::Value::Object(map).to_string())
        }
        _ => Body::from(bytes),
    };

    Response::from_parts(parts, body)
}
