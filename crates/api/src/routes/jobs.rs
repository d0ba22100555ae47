//! Routes for submitting and managing jobs.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Job routes, nested at `/jobs`.
///
/// ```text
/// GET  /             list (filterable, paginated)
/// POST /             submit
/// GET  /stats        queue counters and scheduler state
/// GET  /{id}         fetch one job
/// GET  /{id}/logs    audit trail
/// POST /{id}/cancel  cancel a pending job
/// POST /{id}/run     clear a pending job's scheduled time
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::submit_job))
        .route("/stats", get(jobs::job_stats))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/logs", get(jobs::job_logs))
        .route("/{id}/cancel", post(jobs::cancel_job))
        .route("/{id}/run", post(jobs::run_job_now))
}
