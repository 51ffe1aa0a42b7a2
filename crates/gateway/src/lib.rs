//! Forensight gateway library.
//!
//! The gateway authenticates investigators, keeps their case workspace, and
//! relays evidence images and chat queries to the Inference Service. The
//! binary in `main.rs` only wires configuration, tracing, and Sentry around
//! [`routes::app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod inference;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;
