//! The narrow storage contract the execution core depends on.
//!
//! Everything the executor and the HTTP façade do against durable storage
//! goes through [`JobStore`], so the worker pipeline can run against
//! PostgreSQL in production and against [`MemoryJobStore`] in tests.

use async_trait::async_trait;
use boltzq_core::types::DbId;
use serde_json::Value;

use crate::models::job::{Job, NewJob};

mod memory;
mod postgres;

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A lifecycle precondition did not hold (e.g. a terminal write against
    /// a job that is not running).
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Durable record of job identity, lifecycle state, payloads, and results.
///
/// Terminal fields (`logs`, `metrics`, `results_path`) are written exactly
/// once, by [`complete`](JobStore::complete) or [`fail`](JobStore::fail),
/// and both of those apply only while the job is running.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job in `pending` state.
    async fn create(&self, new_job: NewJob) -> Result<Job, StoreError>;

    /// Fetch one job by id.
    async fn get(&self, id: DbId) -> Result<Option<Job>, StoreError>;

    /// All jobs, newest first.
    async fn list(&self) -> Result<Vec<Job>, StoreError>;

    /// Compare-and-swap `pending -> running`.
    ///
    /// Returns the refreshed row on success, or `None` when the job does
    /// not exist or is not pending; in that case nothing was mutated and
    /// the caller must not execute the job. This is what makes re-dispatch
    /// of the same identifier safe.
    async fn try_start(&self, id: DbId) -> Result<Option<Job>, StoreError>;

    /// Terminal `running -> completed` write: logs, optional metrics, and
    /// the result directory, persisted atomically.
    async fn complete(
        &self,
        id: DbId,
        logs: &str,
        metrics: Option<&Value>,
        results_path: &str,
    ) -> Result<(), StoreError>;

    /// Terminal `running -> failed` write: captured logs (with the error
    /// description already appended by the caller).
    async fn fail(&self, id: DbId, logs: &str) -> Result<(), StoreError>;
}
