//! Handlers for the `/jobs` resource.
//!
//! Submission creates a pending row and hands the identifier to the
//! dispatcher; everything after that happens on a worker. Queries read
//! straight from the store. Result files are served from the job's
//! `results_path` directory.

use std::path::{Component, Path as FsPath, PathBuf};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use boltzq_core::error::CoreError;
use boltzq_core::params::parse_params;
use boltzq_core::types::{DbId, Timestamp};
use boltzq_db::models::job::{Job, JobStatus, NewJob};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Request body for `POST /api/jobs`.
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    /// Human-readable job name.
    pub name: String,
    /// Molecular entities to predict, passed through verbatim to the
    /// tool's input document.
    pub sequences: Vec<Value>,
    /// Flat object of scalar prediction parameters.
    #[serde(default = "default_params")]
    pub params: Value,
}

fn default_params() -> Value {
    json!({})
}

/// Compact job representation for list views: no logs or input payload.
#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub id: DbId,
    pub name: String,
    pub status: JobStatus,
    pub metrics: Option<Value>,
    pub created_at: Timestamp,
}

impl From<Job> for JobSummary {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            name: job.name,
            status: job.status,
            metrics: job.metrics,
            created_at: job.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a job by id or return a 404.
async fn find_job(state: &AppState, job_id: DbId) -> AppResult<Job> {
    state
        .store
        .get(job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))
}

/// Resolve the results directory of a completed job, or 404 when the job
/// has no results yet.
fn results_dir(job: &Job) -> AppResult<PathBuf> {
    job.results_path
        .as_deref()
        .map(PathBuf::from)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "JobResults",
            id: job.id,
        }))
}

/// Reject anything that is not a single, normal path component. Keeps
/// `GET /jobs/{id}/files/{filename}` from escaping the results directory.
fn validate_filename(filename: &str) -> AppResult<()> {
    let mut components = FsPath::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(AppError::BadRequest(format!(
            "Invalid file name: {filename}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/jobs
///
/// Create a pending job and enqueue it for execution. Returns 201 with
/// the created row.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitJobRequest>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Job name must not be empty".into(),
        )));
    }
    if input.sequences.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "At least one sequence entry is required".into(),
        )));
    }

    // Reject malformed parameters at the door instead of failing the job
    // later on a worker.
    parse_params(&input.params)?;

    let inputs = json!({
        "version": 1,
        "sequences": input.sequences,
    });

    let job = state
        .store
        .create(NewJob {
            name: input.name,
            inputs,
            params: input.params,
        })
        .await?;

    state
        .dispatcher
        .enqueue(job.id)
        .map_err(|e| AppError::InternalError(format!("Failed to enqueue job: {e}")))?;

    tracing::info!(job_id = job.id, name = %job.name, "Job submitted");

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/jobs
///
/// List job summaries, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let jobs = state.store.list().await?;
    let summaries: Vec<JobSummary> = jobs.into_iter().map(JobSummary::from).collect();

    Ok(Json(DataResponse { data: summaries }))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/jobs/{id}
///
/// Full job record, including logs and results path.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Result files
// ---------------------------------------------------------------------------

/// GET /api/jobs/{id}/files
///
/// File names in the job's results directory. 404 when the job has no
/// results or the directory no longer exists on disk.
pub async fn list_job_files(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, job_id).await?;
    let dir = results_dir(&job)?;

    let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::Core(CoreError::NotFound {
                entity: "JobResults",
                id: job_id,
            })
        } else {
            AppError::InternalError(format!("Failed to read results directory: {e}"))
        }
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to read results directory: {e}")))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to stat results entry: {e}")))?;
        if file_type.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();

    Ok(Json(DataResponse { data: files }))
}

/// GET /api/jobs/{id}/files/{filename}
///
/// Raw bytes of one result file. Path traversal is rejected as a bad
/// request before touching the filesystem.
pub async fn download_job_file(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    validate_filename(&filename)?;

    let job = find_job(&state, job_id).await?;
    let path = results_dir(&job)?.join(&filename);

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::Core(CoreError::NotFound {
                entity: "JobResultFile",
                id: job_id,
            })
        } else {
            AppError::InternalError(format!("Failed to read result file: {e}"))
        }
    })?;

    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_filenames_pass_validation() {
        assert!(validate_filename("confidence_input_model_0.json").is_ok());
        assert!(validate_filename("input_model_0.cif").is_ok());
    }

    #[test]
    fn traversal_and_absolute_paths_are_rejected() {
        assert!(validate_filename("../secret").is_err());
        assert!(validate_filename("a/b.json").is_err());
        assert!(validate_filename("/etc/passwd").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("").is_err());
    }

    #[test]
    fn summary_drops_heavy_fields() {
        let job = Job {
            id: 7,
            name: "t".into(),
            status: JobStatus::Completed,
            inputs: json!({"version": 1}),
            params: json!({}),
            metrics: Some(json!({"score": 0.5})),
            logs: Some("lots of output".into()),
            results_path: Some("/tmp/r".into()),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let summary = JobSummary::from(job);
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("logs").is_none());
        assert!(value.get("results_path").is_none());
        assert_eq!(value["metrics"]["score"], 0.5);
    }
}
