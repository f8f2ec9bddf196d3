//! HTTP façade over the job execution core.
//!
//! A thin axum layer: job submission and queries, result file access, and
//! a health probe. All domain behaviour lives in `boltzq-core`,
//! `boltzq-db`, and `boltzq-worker`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
