//! End-to-end tests for the Forensight gateway.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the gateway (in-memory stores are fine)
//! GATEWAY_TOKEN_SECRET=... cargo run -p forensight-gateway
//!
//! # Run the ignored end-to-end tests against it
//! cargo test -p forensight-integration-tests -- --ignored
//! ```
//!
//! Tests that reach the Inference Service also need it running behind the
//! gateway's `INFERENCE_BASE_URL`.

use reqwest::Client;
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the gateway (configurable via `GATEWAY_BASE_URL`).
#[must_use]
pub fn gateway_base_url() -> String {
    std::env::var("GATEWAY_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:5000".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// A unique address so repeated runs never collide.
#[must_use]
pub fn unique_email() -> String {
    format!("e2e-{}@example.com", Uuid::new_v4().simple())
}

/// Credentials body for signup and signin.
#[must_use]
pub fn credentials(email: &str, password: &str) -> Value {
    json!({ "email": email, "password": password })
}

/// Register a fresh account and return its email and bearer token.
///
/// # Panics
///
/// Panics if the gateway is unreachable or rejects the signup or signin.
pub async fn signed_in(client: &Client) -> (String, String) {
    let base_url = gateway_base_url();
    let email = unique_email();
    let body = credentials(&email, "e2e correct horse battery");

    let resp = client
        .post(format!("{base_url}/auth/signup"))
        .json(&body)
        .send()
        .await
        .expect("Failed to sign up");
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(format!("{base_url}/auth/signin"))
        .json(&body)
        .send()
        .await
        .expect("Failed to sign in");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("Signin reply is not JSON");
    let token = body["token"]
        .as_str()
        .expect("Signin reply has no token")
        .to_string();
    (email, token)
}
