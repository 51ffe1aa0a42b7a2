//! Business logic services for the gateway.
//!
//! # Services
//!
//! - `auth` - Signup, signin, and bearer token issuance/verification

pub mod auth;
