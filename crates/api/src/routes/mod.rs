pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /jobs                       submit, list
/// /jobs/{id}                  full record
/// /jobs/{id}/files            result file names
/// /jobs/{id}/files/{filename} result file bytes
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/jobs", jobs::router())
}
