//! PostgreSQL implementation of [`JobStore`].
//!
//! Status transitions are guarded in SQL: `try_start` only claims a job
//! that is still pending, and terminal writes only apply to running jobs.
//! Zero rows affected on a terminal write means the lifecycle precondition
//! was violated and surfaces as [`StoreError::Conflict`].

use async_trait::async_trait;
use boltzq_core::types::DbId;
use serde_json::Value;
use sqlx::PgPool;

use crate::models::job::{Job, JobStatus, NewJob};
use crate::store::{JobStore, StoreError};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, name, status, inputs, params, metrics, logs, results_path, \
    created_at, updated_at";

/// Job store backed by the `jobs` table.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let query = format!(
            "INSERT INTO jobs (name, status, inputs, params) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(&new_job.name)
            .bind(JobStatus::Pending)
            .bind(&new_job.inputs)
            .bind(&new_job.params)
            .fetch_one(&self.pool)
            .await?;
        Ok(job)
    }

    async fn get(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs ORDER BY created_at DESC, id DESC");
        let jobs = sqlx::query_as::<_, Job>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(jobs)
    }

    async fn try_start(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        let query = format!(
            "UPDATE jobs \
             SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $3 \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(JobStatus::Running)
            .bind(JobStatus::Pending)
            .fetch_optional(&self.pool)
            .await?;
        match &job {
            Some(_) => tracing::debug!(job_id = id, "Claimed pending job"),
            None => tracing::debug!(job_id = id, "Job missing or already claimed"),
        }
        Ok(job)
    }

    async fn complete(
        &self,
        id: DbId,
        logs: &str,
        metrics: Option<&Value>,
        results_path: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status = $2, logs = $3, metrics = $4, results_path = $5, \
                 updated_at = NOW() \
             WHERE id = $1 AND status = $6",
        )
        .bind(id)
        .bind(JobStatus::Completed)
        .bind(logs)
        .bind(metrics)
        .bind(results_path)
        .bind(JobStatus::Running)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(job_id = id, "Completed state refused: job is not running");
            return Err(StoreError::Conflict(format!(
                "job {id} is not running; completed state not recorded"
            )));
        }
        Ok(())
    }

    async fn fail(&self, id: DbId, logs: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status = $2, logs = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(JobStatus::Failed)
        .bind(logs)
        .bind(JobStatus::Running)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(job_id = id, "Failed state refused: job is not running");
            return Err(StoreError::Conflict(format!(
                "job {id} is not running; failed state not recorded"
            )));
        }
        Ok(())
    }
}
