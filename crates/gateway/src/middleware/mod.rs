//! HTTP middleware stack for the gateway.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, per-request hub)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Error details (development mode only)
//! 5. CORS
//! 6. Body limit (`GATEWAY_MAX_UPLOAD_BYTES`)
//!
//! Authentication is an extractor ([`RequireAuth`]) rather than a layer, so
//! each handler states whether it needs a signed-in user.

pub mod auth;
pub mod error_details;
pub mod request_id;

pub use auth::{AuthenticatedUser, RequireAuth};
pub use error_details::error_details_middleware;
pub use request_id::request_id_middleware;
