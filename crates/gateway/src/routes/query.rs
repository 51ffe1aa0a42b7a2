//! Streaming chat query handler.
//!
//! `POST /query` accepts either a multipart form (`query`, optional `image`,
//! `is_analyzed`, `case_id`) or a JSON body (`query`, optional `case_id`),
//! and relays the Inference Service's reply as `text/event-stream`, chunk by
//! chunk.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    Extension, Json,
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::instrument;

use forensight_core::CaseId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::inference::{ByteStream, EvidenceImage, QueryRequest};
use crate::middleware::RequireAuth;
use crate::middleware::request_id::RequestId;
use crate::state::AppState;

use super::evidence::{Upload, ensure_case_owned};

/// Frame sent in place of the rest of the reply when the upstream stream fails.
const STREAM_ERROR_FRAME: &[u8] = b"event: error\ndata: {\"error\":\"upstream stream interrupted\"}\n\n";

/// JSON form of a query. An empty body reads as the default.
#[derive(Debug, Default, Deserialize)]
pub struct QueryBody {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub case_id: Option<CaseId>,
}

/// A query as received, before gating.
struct IncomingQuery {
    query: String,
    case_id: Option<CaseId>,
    image: Option<EvidenceImage>,
    client_says_analyzed: bool,
}

impl IncomingQuery {
    async fn from_multipart(multipart: Multipart) -> Result<Self> {
        let upload = Upload::read(multipart).await?;
        let case_id = upload.case_id()?;
        let query = upload.field("query").unwrap_or_default().to_owned();
        let client_says_analyzed = upload.field("is_analyzed") == Some("true");
        let image = upload.images.into_iter().next();

        Ok(Self {
            query,
            case_id,
            image,
            client_says_analyzed,
        })
    }

    /// Parse a non-multipart body. The content type is not enforced and an
    /// empty body is a query with no text.
    fn from_json(bytes: &[u8]) -> Result<Self> {
        let body = if bytes.trim_ascii().is_empty() {
            QueryBody::default()
        } else {
            Json::<QueryBody>::from_bytes(bytes)?.0
        };

        Ok(Self {
            query: body.query,
            case_id: body.case_id,
            image: None,
            client_says_analyzed: false,
        })
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

/// Relay a chat query and stream the reply.
///
/// An uploaded image is forwarded only when it is known to have been
/// analyzed: by its digest against the case's analyzed set when a `case_id`
/// is given, otherwise by the client's `is_analyzed` flag.
#[instrument(skip_all)]
pub async fn query(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Extension(request_id): Extension<RequestId>,
    request: Request,
) -> Result<Response> {
    let incoming = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state).await?;
        IncomingQuery::from_multipart(multipart).await?
    } else {
        let bytes = Bytes::from_request(request, &state).await?;
        IncomingQuery::from_json(&bytes)?
    };

    let query = incoming.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("Query is required".to_string()));
    }

    if let Some(case_id) = incoming.case_id {
        ensure_case_owned(&state, user.id, case_id).await?;
    }

    let analyzed_image = match (incoming.image, incoming.case_id) {
        (Some(image), Some(case_id)) => {
            let analyzed = state
                .cases()
                .is_analyzed(user.id, case_id, &image.digest())
                .await?;
            analyzed.then_some(image)
        }
        (Some(image), None) => incoming.client_says_analyzed.then_some(image),
        (None, _) => None,
    };

    tracing::info!(
        case_id = ?incoming.case_id,
        with_image = analyzed_image.is_some(),
        "Relaying query"
    );
    add_breadcrumb("relay", "Streaming query", None);

    let upstream = state
        .inference()
        .stream_query(QueryRequest {
            query: query.to_owned(),
            case_id: incoming.case_id,
            analyzed_image,
            request_id: Some(request_id.0),
        })
        .await
        .map_err(|e| AppError::upstream("Internal server error", e))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(relay_body_stream(upstream)),
    )
        .into_response())
}

/// Logs when the response body is dropped before the upstream finished.
#[derive(Default)]
struct DisconnectGuard {
    completed: bool,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if !self.completed {
            tracing::debug!("Client disconnected; dropping inference stream");
        }
    }
}

/// Turn the upstream byte stream into a response body stream.
///
/// Chunks pass through in order. An upstream failure ends the body with
/// [`STREAM_ERROR_FRAME`]; headers are already sent by then.
pub(crate) fn relay_body_stream(
    mut upstream: ByteStream,
) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> + Send + 'static {
    stream! {
        let mut guard = DisconnectGuard::default();

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => yield Ok(bytes),
                Err(e) => {
                    tracing::warn!(error = %e, "Inference stream interrupted");
                    yield Ok(Bytes::from_static(STREAM_ERROR_FRAME));
                    break;
                }
            }
        }

        guard.completed = true;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use futures::stream;

    use super::*;
    use crate::inference::InferenceError;

    async fn collect(upstream: ByteStream) -> Vec<Bytes> {
        relay_body_stream(upstream)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_chunks_forwarded_in_order() {
        let upstream = stream::iter(vec![
            Ok(Bytes::from_static(b"data: one\n\n")),
            Ok(Bytes::from_static(b"data: two\n\n")),
        ])
        .boxed();

        let chunks = collect(upstream).await;
        assert_eq!(
            chunks,
            vec![
                Bytes::from_static(b"data: one\n\n"),
                Bytes::from_static(b"data: two\n\n"),
            ]
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_ends_with_error_frame() {
        let upstream = stream::iter(vec![
            Ok(Bytes::from_static(b"data: one\n\n")),
            Err(InferenceError::Parse("connection reset".to_string())),
            Ok(Bytes::from_static(b"data: never\n\n")),
        ])
        .boxed();

        let chunks = collect(upstream).await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks.last(), Some(&Bytes::from_static(STREAM_ERROR_FRAME)));
    }

    #[tokio::test]
    async fn test_dropping_body_midway() {
        let upstream = stream::iter(vec![
            Ok(Bytes::from_static(b"data: one\n\n")),
            Ok(Bytes::from_static(b"data: two\n\n")),
        ])
        .boxed();

        let mut body = Box::pin(relay_body_stream(upstream));
        let first = body.next().await.unwrap().unwrap();
        assert_eq!(first, Bytes::from_static(b"data: one\n\n"));
        drop(body);
    }

    #[test]
    fn test_is_multipart() {
        let mut headers = HeaderMap::new();
        assert!(!is_multipart(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=abc"),
        );
        assert!(is_multipart(&headers));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_multipart(&headers));
    }

    #[test]
    fn test_query_body_defaults() {
        let body: QueryBody = serde_json::from_str("{}").unwrap();
        assert!(body.query.is_empty());
        assert!(body.case_id.is_none());

        let body: QueryBody = serde_json::from_str(r#"{"query":"hi","case_id":7}"#).unwrap();
        assert_eq!(body.case_id, Some(CaseId::new(7)));
    }

    #[test]
    fn test_body_without_json_is_an_empty_query() {
        for raw in [&b""[..], &b"  \n"[..]] {
            let incoming = IncomingQuery::from_json(raw).unwrap();
            assert!(incoming.query.is_empty());
            assert!(incoming.case_id.is_none());
        }

        let incoming = IncomingQuery::from_json(br#"{"query":"who was here?"}"#).unwrap();
        assert_eq!(incoming.query, "who was here?");

        let err = IncomingQuery::from_json(b"{not json").err().unwrap();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
