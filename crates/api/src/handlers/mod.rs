//! Request handlers, grouped by resource.

pub mod jobs;
