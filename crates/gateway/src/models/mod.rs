//! Domain models for the gateway.
//!
//! These are validated domain objects, separate from database row types.

pub mod case;
pub mod user;

pub use case::{Case, CaseUpdate, NewCase};
pub use user::{PublicUser, User};
