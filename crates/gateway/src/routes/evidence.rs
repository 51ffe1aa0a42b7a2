//! Buffered Evidence Relay handlers.
//!
//! Each handler reads the multipart upload, checks that at least one image
//! is present, forwards the images to the matching Inference Service
//! endpoint, and returns the service's JSON reply verbatim.

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use tracing::instrument;

use forensight_core::{CaseId, UserId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::inference::{AnalysisEndpoint, AnalysisResult, EvidenceImage};
use crate::middleware::RequireAuth;
use crate::middleware::request_id::RequestId;
use crate::state::AppState;

/// Multipart field names that carry evidence images.
const IMAGE_FIELDS: &[&str] = &["images", "images[]", "image"];

/// A parsed multipart upload: image parts in order plus any text fields.
#[derive(Debug, Default)]
pub(crate) struct Upload {
    pub images: Vec<EvidenceImage>,
    pub fields: HashMap<String, String>,
}

impl Upload {
    /// Read every part of a multipart body.
    ///
    /// Image parts with no bytes count as absent (browsers send one when the
    /// file input is left empty).
    pub(crate) async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut upload = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();

            if IMAGE_FIELDS.contains(&name.as_str()) || field.file_name().is_some() {
                let filename = field.file_name().unwrap_or("upload").to_owned();
                let mime_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    continue;
                }
                upload
                    .images
                    .push(EvidenceImage::new(bytes, filename, mime_type.as_deref()));
            } else {
                let value = field.text().await?;
                upload.fields.insert(name, value);
            }
        }

        Ok(upload)
    }

    /// The text field `name`, trimmed; `None` when absent or blank.
    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// The optional `case_id` text field.
    pub(crate) fn case_id(&self) -> Result<Option<CaseId>> {
        self.field("case_id")
            .map(|raw| {
                raw.parse::<CaseId>()
                    .map_err(|_| AppError::Validation("Invalid case_id".to_string()))
            })
            .transpose()
    }

    /// Images to forward for `endpoint`: all of them, or only the first for
    /// single-image endpoints.
    pub(crate) fn take_images(&mut self, endpoint: AnalysisEndpoint) -> Result<Vec<EvidenceImage>> {
        let mut images = std::mem::take(&mut self.images);
        if images.is_empty() {
            return Err(AppError::Validation(endpoint.missing_message().to_string()));
        }
        if !endpoint.accepts_multiple() {
            images.truncate(1);
        }
        Ok(images)
    }
}

/// Check that `case_id` names a case owned by the caller.
pub(crate) async fn ensure_case_owned(
    state: &AppState,
    owner: UserId,
    case_id: CaseId,
) -> Result<()> {
    if state.cases().get(owner, case_id).await?.is_none() {
        return Err(AppError::NotFound("Case not found".to_string()));
    }
    Ok(())
}

/// Forward images to `endpoint` and return the reply.
async fn relay(
    state: &AppState,
    endpoint: AnalysisEndpoint,
    images: &[EvidenceImage],
    request_id: &RequestId,
) -> Result<serde_json::Value> {
    let count = images.len().to_string();
    add_breadcrumb(
        "relay",
        "Forwarding evidence",
        Some(&[("endpoint", endpoint.upstream_path()), ("image_count", count.as_str())]),
    );

    state
        .inference()
        .forward_images(endpoint, images, Some(request_id.as_str()))
        .await
        .map_err(|e| AppError::upstream(endpoint.failure_message(), e))
}

/// Shared body of the endpoints that need nothing beyond the images.
async fn forward(
    state: &AppState,
    endpoint: AnalysisEndpoint,
    multipart: std::result::Result<Multipart, MultipartRejection>,
    request_id: &RequestId,
) -> Result<Json<serde_json::Value>> {
    let mut upload = Upload::read(multipart?).await?;
    let images = upload.take_images(endpoint)?;
    tracing::info!(%endpoint, image_count = images.len(), "Relaying evidence");

    relay(state, endpoint, &images, request_id).await.map(Json)
}

/// Crime classification.
///
/// With a `case_id`, every uploaded image's digest is recorded in that
/// case's analyzed set once the service returns one result per image.
#[instrument(skip_all)]
pub async fn analyze(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Extension(request_id): Extension<RequestId>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>> {
    let endpoint = AnalysisEndpoint::Analyze;
    let mut upload = Upload::read(multipart?).await?;
    let case_id = upload.case_id()?;
    let images = upload.take_images(endpoint)?;

    if let Some(case_id) = case_id {
        ensure_case_owned(&state, user.id, case_id).await?;
    }
    tracing::info!(image_count = images.len(), case_id = ?case_id, "Relaying evidence for analysis");

    let reply = relay(&state, endpoint, &images, &request_id).await?;

    for (index, result) in AnalysisResult::parse_all(&reply) {
        tracing::debug!(
            image_index = index,
            crime_type = %result.predicted_crime_type,
            confidence = result.confidence_score,
            "Analysis result"
        );
    }

    if let Some(case_id) = case_id {
        let returned = AnalysisResult::count_in(&reply);
        if returned == images.len() {
            let digests: Vec<_> = images.iter().map(EvidenceImage::digest).collect();
            // The analysis itself succeeded; a bookkeeping failure is logged, not returned
            if let Err(e) = state
                .cases()
                .record_analyzed(user.id, case_id, &digests)
                .await
            {
                tracing::error!(error = %e, %case_id, "Failed to record analyzed images");
            }
        } else {
            tracing::warn!(
                %case_id,
                sent = images.len(),
                returned,
                "Result count mismatch; analyzed images not recorded"
            );
        }
    }

    Ok(Json(reply))
}

/// Evidence-collection guide for a single image.
pub async fn evidence_guide(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Extension(request_id): Extension<RequestId>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>> {
    forward(&state, AnalysisEndpoint::EvidenceGuide, multipart, &request_id).await
}

/// Case report over the uploaded images.
pub async fn case_report(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Extension(request_id): Extension<RequestId>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>> {
    forward(&state, AnalysisEndpoint::CaseReport, multipart, &request_id).await
}

/// Fingerprint detection on a single image.
pub async fn fingerprint(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Extension(request_id): Extension<RequestId>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>> {
    forward(&state, AnalysisEndpoint::Fingerprint, multipart, &request_id).await
}

/// Image enhancement on a single image.
pub async fn enhance(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Extension(request_id): Extension<RequestId>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>> {
    forward(&state, AnalysisEndpoint::Enhance, multipart, &request_id).await
}

/// Pattern analysis over the uploaded images.
pub async fn patterns(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Extension(request_id): Extension<RequestId>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>> {
    forward(&state, AnalysisEndpoint::Patterns, multipart, &request_id).await
}
