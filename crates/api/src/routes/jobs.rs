//! Route definitions for the `/jobs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                        -> list_jobs
/// POST   /                        -> submit_job
/// GET    /{id}                    -> get_job
/// GET    /{id}/files              -> list_job_files
/// GET    /{id}/files/{filename}   -> download_job_file
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::submit_job))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/files", get(jobs::list_job_files))
        .route("/{id}/files/{filename}", get(jobs::download_job_file))
}
