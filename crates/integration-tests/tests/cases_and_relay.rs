//! End-to-end tests for the case workspace and the evidence relay.
//!
//! These tests require a running gateway. The relay tests additionally need
//! the Inference Service reachable from the gateway.

use futures::StreamExt;
use forensight_integration_tests::{gateway_base_url, signed_in};
use reqwest::{Client, StatusCode, multipart};
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running gateway"]
async fn test_case_lifecycle() {
    let client = Client::new();
    let base_url = gateway_base_url();
    let (_, token) = signed_in(&client).await;

    let resp = client
        .post(format!("{base_url}/cases"))
        .bearer_auth(&token)
        .json(&json!({"title": "E2E case", "type": "Theft"}))
        .send()
        .await
        .expect("Failed to create case");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("Not JSON");
    let case_id = body["case_id"].as_i64().expect("No case_id");

    let resp = client
        .put(format!("{base_url}/cases/{case_id}"))
        .bearer_auth(&token)
        .json(&json!({"status": "Under Investigation"}))
        .send()
        .await
        .expect("Failed to update case");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base_url}/cases/{case_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to get case");
    let case: Value = resp.json().await.expect("Not JSON");
    assert_eq!(case["status"], "Under Investigation");

    // Another account cannot see it
    let (_, other) = signed_in(&client).await;
    let resp = client
        .get(format!("{base_url}/cases/{case_id}"))
        .bearer_auth(&other)
        .send()
        .await
        .expect("Failed to get case");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .delete(format!("{base_url}/cases/{case_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to delete case");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running gateway"]
async fn test_analyze_without_images() {
    let client = Client::new();
    let (_, token) = signed_in(&client).await;

    let form = multipart::Form::new().text("case_id", "1");
    let resp = client
        .post(format!("{}/analyze", gateway_base_url()))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to call /analyze");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Not JSON");
    assert_eq!(body, json!({"error": "No images uploaded."}));
}

#[tokio::test]
#[ignore = "Requires running gateway and Inference Service"]
async fn test_query_streams() {
    let client = Client::new();
    let (_, token) = signed_in(&client).await;

    let resp = client
        .post(format!("{}/query", gateway_base_url()))
        .bearer_auth(&token)
        .json(&json!({"query": "What evidence should I collect at a burglary scene?"}))
        .send()
        .await
        .expect("Failed to call /query");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );

    let mut chunks = 0;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        chunk.expect("Stream interrupted");
        chunks += 1;
    }
    assert!(chunks > 0);
}
