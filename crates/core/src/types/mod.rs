//! Core types for Forensight.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod digest;
pub mod email;
pub mod id;
pub mod status;

pub use digest::{DigestError, ImageDigest};
pub use email::{Email, EmailError};
pub use id::*;
pub use status::CaseStatus;
