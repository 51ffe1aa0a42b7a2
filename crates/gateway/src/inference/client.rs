//! HTTP client for the Inference Service.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::body::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::multipart::Form;
use serde::Serialize;
use tracing::instrument;
use url::Url;

use forensight_core::CaseId;

use crate::config::InferenceConfig;
use crate::middleware::request_id::REQUEST_ID_HEADER;

use super::error::InferenceError;
use super::types::{AnalysisEndpoint, EvidenceImage, QueryRequest};

const PROCESS_QUERY_PATH: &str = "process_query";

/// Reply body of a streaming query, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, InferenceError>>;

/// Inference Service client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct InferenceClient {
    inner: Arc<InferenceClientInner>,
}

struct InferenceClientInner {
    client: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
}

/// JSON body for a text-only query.
#[derive(Serialize)]
struct TextQuery<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    case_id: Option<CaseId>,
}

impl InferenceClient {
    /// Create a new Inference Service client.
    ///
    /// The connect timeout applies to every call. The request timeout applies
    /// to buffered calls only; streams run as long as the service keeps
    /// sending.
    ///
    /// # Errors
    ///
    /// Returns `InferenceError::Http` if the HTTP client cannot be built.
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(InferenceClientInner {
                client,
                base_url: config.base_url.clone(),
                request_timeout: config.request_timeout,
            }),
        })
    }

    /// Base URL the client resolves endpoint paths against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Forward images to a buffered endpoint and return its JSON reply verbatim.
    ///
    /// Every image goes out as a part named `images`, in upload order. The
    /// gateway's request ID, when given, is sent as `x-request-id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the service answers with a
    /// non-success status, or the reply is not JSON.
    #[instrument(skip(self, images, request_id), fields(image_count = images.len()))]
    pub async fn forward_images(
        &self,
        endpoint: AnalysisEndpoint,
        images: &[EvidenceImage],
        request_id: Option<&str>,
    ) -> Result<serde_json::Value, InferenceError> {
        let url = self.endpoint_url(endpoint.upstream_path())?;

        let mut form = Form::new();
        for image in images {
            form = form.part("images", image.to_part()?);
        }

        let response = with_request_id(self.inner.client.post(url), request_id)
            .multipart(form)
            .timeout(self.inner.request_timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(InferenceError::status(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| InferenceError::Parse(format!("Failed to parse {endpoint} reply: {e}")))
    }

    /// Send a chat query and stream the reply body back chunk by chunk.
    ///
    /// With an analyzed image the request is multipart
    /// (`query`, `image`, `is_analyzed=true`, optional `case_id`); without one
    /// it is JSON (`query`, optional `case_id`).
    ///
    /// Dropping the returned stream drops the upstream response and closes
    /// its connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service answers with a
    /// non-success status before any chunk is sent.
    #[instrument(
        skip(self, request),
        fields(case_id = ?request.case_id, with_image = request.analyzed_image.is_some())
    )]
    pub async fn stream_query(
        &self,
        request: QueryRequest,
    ) -> Result<ByteStream, InferenceError> {
        let url = self.endpoint_url(PROCESS_QUERY_PATH)?;

        let builder = with_request_id(self.inner.client.post(url), request.request_id.as_deref());
        let builder = if let Some(image) = &request.analyzed_image {
            let mut form = Form::new()
                .text("query", request.query.clone())
                .part("image", image.to_part()?)
                .text("is_analyzed", "true");
            if let Some(case_id) = request.case_id {
                form = form.text("case_id", case_id.to_string());
            }
            builder.multipart(form)
        } else {
            builder.json(&TextQuery {
                query: &request.query,
                case_id: request.case_id,
            })
        };

        let response = builder.send().await?;

        // Check for error responses before streaming
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::status(status, &body));
        }

        Ok(stream! {
            let mut chunks = 0_usize;
            let mut byte_stream = std::pin::pin!(response.bytes_stream());

            while let Some(chunk_result) = byte_stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        chunks += 1;
                        yield Ok(chunk);
                    }
                    Err(e) => {
                        yield Err(InferenceError::Http(e));
                        return;
                    }
                }
            }

            tracing::debug!(chunks, "Inference stream finished");
        }
        .boxed())
    }

    fn endpoint_url(&self, path: &str) -> Result<Url, InferenceError> {
        Ok(self.inner.base_url.join(path)?)
    }
}

fn with_request_id(
    builder: reqwest::RequestBuilder,
    request_id: Option<&str>,
) -> reqwest::RequestBuilder {
    match request_id {
        Some(id) => builder.header(REQUEST_ID_HEADER, id),
        None => builder,
    }
}
