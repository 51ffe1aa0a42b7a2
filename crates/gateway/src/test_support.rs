//! Shared fixtures for router tests: an in-memory gateway and a fake
//! Inference Service listening on a loopback port.

#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::new_without_default
)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, Bytes, to_bytes},
    extract::{FromRequest, Multipart, Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use futures::stream;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::config::{AuthConfig, Environment, GatewayConfig, InferenceConfig};
use crate::db::Stores;
use crate::routes;
use crate::state::AppState;

/// Address nothing listens on; connections are refused.
pub const CLOSED_PORT_URL: &str = "http://127.0.0.1:9/";

const TEST_SECRET: &str = "q7Vd2LxN9pRk4TzW8yHb3MfJ6sGc1AeU5oQi0XnZ";

/// Gateway configuration pointing at `inference_url`.
pub fn test_config(inference_url: &str) -> GatewayConfig {
    GatewayConfig {
        database_url: None,
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        environment: Environment::Production,
        auth: AuthConfig {
            token_secret: SecretString::from(TEST_SECRET),
            token_ttl: Duration::from_secs(3600),
        },
        inference: InferenceConfig {
            base_url: crate::config::parse_base_url(inference_url).unwrap(),
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
        },
        max_upload_bytes: 1024 * 1024,
        cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Build the full application over in-memory stores.
pub fn app_with(config: GatewayConfig) -> Router {
    let state = AppState::new(config, Stores::memory()).unwrap();
    routes::app(state)
}

/// A `/process_query` call as the fake service saw it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedQuery {
    pub query: String,
    pub case_id: Option<String>,
    pub with_image: bool,
    pub is_analyzed: Option<String>,
    pub request_id: Option<String>,
}

/// Fake Inference Service.
#[derive(Clone)]
pub struct FakeInference {
    pub base_url: String,
    queries: Arc<Mutex<Vec<RecordedQuery>>>,
}

impl FakeInference {
    /// Start the fake on an ephemeral loopback port.
    pub async fn spawn() -> Self {
        let queries = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/analyze", post(fake_analyze))
            .route("/evidence-guide", post(fake_echo))
            .route("/generate_report", post(fake_echo))
            .route("/fingerprint", post(fake_echo))
            .route("/enhance", post(fake_echo))
            .route("/patterns", post(fake_echo))
            .route("/process_query", post(fake_process_query))
            .with_state(queries.clone());

        Self {
            base_url: serve(app).await,
            queries,
        }
    }

    /// Start a fake that answers every call with an error status before any
    /// body is produced: 502 for queries, 500 for everything else.
    pub async fn spawn_failing() -> Self {
        let app = Router::new()
            .route(
                "/process_query",
                post(|| async { (StatusCode::BAD_GATEWAY, "model worker offline") }),
            )
            .fallback(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "CUDA out of memory on gpu-2"})),
                )
            });

        Self {
            base_url: serve(app).await,
            queries: Arc::default(),
        }
    }

    /// Every query received so far, in order.
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

/// Gateway wired to a fresh fake Inference Service.
pub async fn test_app() -> (Router, FakeInference) {
    let fake = FakeInference::spawn().await;
    let app = app_with(test_config(&fake.base_url));
    (app, fake)
}

async fn image_filenames(mut multipart: Multipart) -> Vec<String> {
    let mut names = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("images") {
            names.push(field.file_name().unwrap_or_default().to_string());
        }
        let _ = field.bytes().await.unwrap();
    }
    names
}

async fn fake_analyze(multipart: Multipart) -> Json<Value> {
    let results: Vec<Value> = image_filenames(multipart)
        .await
        .iter()
        .map(|name| {
            json!({
                "filename": name,
                "predicted_crime_type": "Property",
                "predicted_crime": "Burglary",
                "confidence_score": 0.91,
            })
        })
        .collect();
    Json(json!({ "results": results }))
}

async fn fake_echo(request: Request) -> Json<Value> {
    let endpoint = request.uri().path().trim_start_matches('/').to_string();
    let multipart = Multipart::from_request(request, &()).await.unwrap();
    let filenames = image_filenames(multipart).await;
    Json(json!({ "endpoint": endpoint, "filenames": filenames }))
}

async fn fake_process_query(
    State(queries): State<Arc<Mutex<Vec<RecordedQuery>>>>,
    request: Request,
) -> impl IntoResponse {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/"));

    let mut recorded = RecordedQuery {
        request_id,
        ..RecordedQuery::default()
    };

    if is_multipart {
        let mut multipart = Multipart::from_request(request, &()).await.unwrap();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap();
            let text = String::from_utf8_lossy(&bytes).into_owned();
            match name.as_str() {
                "query" => recorded.query = text,
                "case_id" => recorded.case_id = Some(text),
                "is_analyzed" => recorded.is_analyzed = Some(text),
                "image" => recorded.with_image = !bytes.is_empty(),
                _ => {}
            }
        }
    } else {
        let Json(body) = Json::<Value>::from_request(request, &()).await.unwrap();
        recorded.query = body["query"].as_str().unwrap_or_default().to_string();
        recorded.case_id = body.get("case_id").map(ToString::to_string);
    }

    queries.lock().unwrap().push(recorded);

    let chunks = (0..3).map(|n| Ok::<_, std::convert::Infallible>(format!("data: chunk-{n}\n\n")));
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(stream::iter(chunks)),
    )
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartBody {
    boundary: &'static str,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "forensight-test-boundary",
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: image/jpeg\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Content type header value and the finished body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

/// A fully read response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }
}

/// Send a request through the router and read the whole response.
pub async fn send(app: &Router, request: Request) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

/// JSON request, optionally authenticated.
pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request {
    builder(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Body-less request, optionally authenticated.
pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request {
    builder(method, uri, token).body(Body::empty()).unwrap()
}

/// Multipart POST, authenticated.
pub fn multipart_request(uri: &str, token: &str, form: MultipartBody) -> Request {
    let (content_type, body) = form.finish();
    builder(Method::POST, uri, Some(token))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

/// Register `email` and return a bearer token for it.
pub async fn signed_in(app: &Router, email: &str) -> String {
    let credentials = json!({ "email": email, "password": "correct horse battery" });

    let response = send(
        app,
        json_request(Method::POST, "/auth/signup", None, &credentials),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = send(
        app,
        json_request(Method::POST, "/auth/signin", None, &credentials),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    response.json()["token"].as_str().unwrap().to_string()
}
