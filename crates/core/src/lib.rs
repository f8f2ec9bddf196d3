//! Domain logic for the prediction job pipeline.
//!
//! Everything in this crate is independent of the database and the HTTP
//! layer: parameter handling, tool command construction, supervised process
//! execution, result extraction, and the per-job workspace on disk.

pub mod command;
pub mod error;
pub mod extract;
pub mod params;
pub mod process;
pub mod types;
pub mod workspace;
