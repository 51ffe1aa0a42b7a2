//! Evidence Relay client for the external Inference Service.
//!
//! The Inference Service is an opaque HTTP collaborator. The gateway talks
//! to it in two modes:
//!
//! - **Buffered**: evidence images go out as `multipart/form-data` (field
//!   `images`) and the full JSON reply comes back verbatim.
//! - **Streaming**: chat queries go to `/process_query` and the reply body
//!   is handed back as a stream of byte chunks, in arrival order.
//!
//! No call is retried.

mod client;
mod error;
mod types;

pub use client::{ByteStream, InferenceClient};
pub use error::InferenceError;
pub use types::{AnalysisEndpoint, AnalysisResult, EvidenceImage, QueryRequest};
