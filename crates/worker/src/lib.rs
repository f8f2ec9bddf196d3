//! Job execution engine: the dispatcher queue, the worker pool, and the
//! executor that drives one job through its lifecycle.

pub mod config;
pub mod dispatcher;
pub mod executor;
