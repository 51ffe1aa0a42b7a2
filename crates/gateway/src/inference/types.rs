//! Request and response types for the Inference Service.

use axum::body::Bytes;
use serde::Deserialize;

use forensight_core::{CaseId, ImageDigest};

use super::InferenceError;

const FALLBACK_MIME: &str = "application/octet-stream";

/// An uploaded evidence image, held only for the duration of one request.
#[derive(Debug, Clone)]
pub struct EvidenceImage {
    pub bytes: Bytes,
    pub filename: String,
    pub mime_type: String,
}

impl EvidenceImage {
    /// Build an image, defaulting the MIME type when the client sent none.
    #[must_use]
    pub fn new(bytes: Bytes, filename: impl Into<String>, mime_type: Option<&str>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            mime_type: mime_type.unwrap_or(FALLBACK_MIME).to_owned(),
        }
    }

    /// SHA-256 of the image bytes.
    #[must_use]
    pub fn digest(&self) -> ImageDigest {
        ImageDigest::of(&self.bytes)
    }

    /// Build a multipart part carrying the original filename and MIME type.
    pub(crate) fn to_part(&self) -> Result<reqwest::multipart::Part, InferenceError> {
        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::from(self.bytes.clone()),
            self.bytes.len() as u64,
        )
        .file_name(self.filename.clone())
        .mime_str(&self.mime_type)?;
        Ok(part)
    }
}

/// The buffered relay operations and where each one lands upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisEndpoint {
    /// Crime classification for one or more images.
    Analyze,
    /// Evidence-collection guide for a single image.
    EvidenceGuide,
    /// Written case report over one or more images.
    CaseReport,
    /// Fingerprint detection on a single image.
    Fingerprint,
    /// Image enhancement on a single image.
    Enhance,
    /// Pattern analysis over one or more images.
    Patterns,
}

impl AnalysisEndpoint {
    /// Path on the Inference Service, relative to its base URL.
    #[must_use]
    pub const fn upstream_path(self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::EvidenceGuide => "evidence-guide",
            Self::CaseReport => "generate_report",
            Self::Fingerprint => "fingerprint",
            Self::Enhance => "enhance",
            Self::Patterns => "patterns",
        }
    }

    /// Whether every uploaded image is forwarded, or only the first.
    #[must_use]
    pub const fn accepts_multiple(self) -> bool {
        matches!(self, Self::Analyze | Self::CaseReport | Self::Patterns)
    }

    /// Client-facing message when no image was uploaded.
    #[must_use]
    pub const fn missing_message(self) -> &'static str {
        match self {
            Self::Analyze | Self::CaseReport => "No images uploaded.",
            Self::EvidenceGuide => "No image uploaded.",
            Self::Fingerprint | Self::Enhance => "No image provided",
            Self::Patterns => "No images provided",
        }
    }

    /// Client-facing message when the Inference Service call fails.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Analyze => "Failed to analyze evidence.",
            Self::EvidenceGuide => "Failed to generate evidence guide.",
            Self::CaseReport => "Failed to generate case report.",
            Self::Fingerprint => "Failed to process fingerprint detection",
            Self::Enhance => "Failed to process image enhancement",
            Self::Patterns => "Failed to process pattern analysis",
        }
    }
}

impl std::fmt::Display for AnalysisEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.upstream_path())
    }
}

/// A chat query bound for `/process_query`.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    /// Forwarded so the service can key its last-image state per case.
    pub case_id: Option<CaseId>,
    /// Attached only when the image is known to have been analyzed.
    pub analyzed_image: Option<EvidenceImage>,
    /// Gateway request ID, passed on for log correlation.
    pub request_id: Option<String>,
}

/// One per-image classification from `/analyze`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub predicted_crime_type: String,
    /// Free-text description of the predicted crime.
    pub predicted_crime: String,
    pub confidence_score: f64,
}

impl AnalysisResult {
    /// Number of entries in an `/analyze` reply's `results` array.
    ///
    /// The service skips images it fails to process, so this can be smaller
    /// than the number of images sent.
    #[must_use]
    pub fn count_in(reply: &serde_json::Value) -> usize {
        reply
            .get("results")
            .and_then(serde_json::Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Typed view of an `/analyze` reply, paired with each result's image index.
    #[must_use]
    pub fn parse_all(reply: &serde_json::Value) -> Vec<(usize, Self)> {
        reply
            .get("results")
            .and_then(serde_json::Value::as_array)
            .into_iter()
            .flatten()
            .enumerate()
            .filter_map(|(index, value)| {
                Self::deserialize(value).ok().map(|result| (index, result))
            })
            .collect()
    }
}
