//! HTTP route handlers for the gateway.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health              - Liveness check
//! GET    /health/ready        - Readiness check (store reachable)
//!
//! # Auth
//! POST   /auth/signup         - Register {email, password}
//! POST   /auth/signin         - Sign in, returns {token, user}
//! GET    /auth/me             - Identity of the bearer token (auth)
//!
//! # Evidence Relay (auth, multipart field `images`)
//! POST   /analyze             - Crime classification, optional case_id
//! POST   /evidence-guide      - Evidence-collection guide (single image)
//! POST   /case-report         - Case report
//! POST   /fingerprint         - Fingerprint detection (single image)
//! POST   /enhance             - Image enhancement (single image)
//! POST   /patterns            - Pattern analysis
//! POST   /query               - Streaming chat (multipart or JSON)
//!
//! # Cases (auth, owner-scoped)
//! GET    /cases               - List own cases, newest first
//! POST   /cases               - Create
//! GET    /cases/{id}          - Get
//! PUT    /cases/{id}          - Partial update
//! DELETE /cases/{id}          - Delete
//! ```

pub mod auth;
pub mod cases;
pub mod evidence;
pub mod health;
pub mod query;


use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::field::Empty;

use crate::middleware::{error_details_middleware, request_id_middleware};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route("/me", get(auth::me))
}

/// Create the case routes router.
pub fn case_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cases::index).post(cases::create))
        .route(
            "/{id}",
            get(cases::show).put(cases::update).delete(cases::destroy),
        )
}

/// Create the Evidence Relay routes router.
pub fn relay_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(evidence::analyze))
        .route("/evidence-guide", post(evidence::evidence_guide))
        .route("/case-report", post(evidence::case_report))
        .route("/fingerprint", post(evidence::fingerprint))
        .route("/enhance", post(evidence::enhance))
        .route("/patterns", post(evidence::patterns))
        .route("/query", post(query::query))
}

/// Create all routes for the gateway.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes())
        .nest("/cases", case_routes())
        .merge(relay_routes())
}

/// Build the complete application: routes, middleware, and state.
///
/// Sentry layers are added by the binary on top of this.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let body_limit = DefaultBodyLimit::max(config.max_upload_bytes);
    let cors = cors_layer(&config.cors_allowed_origins);

    Router::new()
        .merge(routes())
        .layer(body_limit)
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error_details_middleware,
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = Empty,
                    user_id = Empty,
                )
            }),
        )
        .with_state(state)
}

/// CORS for the browser frontend. Unparseable origins are skipped with a warning.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::HeaderName::from_static(
            crate::middleware::request_id::REQUEST_ID_HEADER,
        )])
}
