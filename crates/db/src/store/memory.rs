//! In-memory implementation of [`JobStore`].
//!
//! Backs the hermetic test suites and local development without a
//! database. Implements exactly the same lifecycle guards as the
//! PostgreSQL store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use boltzq_core::types::DbId;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::models::job::{Job, JobStatus, NewJob};
use crate::store::{JobStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    next_id: DbId,
    jobs: BTreeMap<DbId, Job>,
}

/// Job store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    inner: RwLock<Inner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let now = chrono::Utc::now();
        let job = Job {
            id: inner.next_id,
            name: new_job.name,
            status: JobStatus::Pending,
            inputs: new_job.inputs,
            params: new_job.params,
            metrics: None,
            logs: None,
            results_path: None,
            created_at: now,
            updated_at: now,
        };
        inner.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        Ok(self.inner.read().await.jobs.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.read().await;
        // Ids are assigned monotonically, so descending id order is
        // creation order, newest first.
        Ok(inner.jobs.values().rev().cloned().collect())
    }

    async fn try_start(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(job) = inner.jobs.get_mut(&id) else {
            return Ok(None);
        };
        if job.status != JobStatus::Pending {
            return Ok(None);
        }
        job.status = JobStatus::Running;
        job.updated_at = chrono::Utc::now();
        Ok(Some(job.clone()))
    }

    async fn complete(
        &self,
        id: DbId,
        logs: &str,
        metrics: Option<&Value>,
        results_path: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(&id)
            .filter(|job| job.status == JobStatus::Running)
            .ok_or_else(|| {
                StoreError::Conflict(format!(
                    "job {id} is not running; completed state not recorded"
                ))
            })?;
        job.status = JobStatus::Completed;
        job.logs = Some(logs.to_string());
        job.metrics = metrics.cloned();
        job.results_path = Some(results_path.to_string());
        job.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn fail(&self, id: DbId, logs: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(&id)
            .filter(|job| job.status == JobStatus::Running)
            .ok_or_else(|| {
                StoreError::Conflict(format!(
                    "job {id} is not running; failed state not recorded"
                ))
            })?;
        job.status = JobStatus::Failed;
        job.logs = Some(logs.to_string());
        job.updated_at = chrono::Utc::now();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
