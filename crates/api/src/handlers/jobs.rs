//! Handlers for the `/jobs` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use conveyor_core::error::CoreError;
use conveyor_core::jobs::state_machine::status_name;
use conveyor_core::jobs::ACTION_CANCELLED;
use conveyor_core::types::DbId;
use conveyor_db::models::job::{Job, JobListQuery, JobStats, SubmitJob};
use conveyor_db::models::status::JobStatus;
use conveyor_db::JobStore;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a job by ID, mapping a missing row to `NotFound`.
async fn find_job(store: &dyn JobStore, job_id: DbId) -> AppResult<Job> {
    store
        .find_by_id(job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Submit a new background job. Returns 201 with the created job.
/// The job starts in `pending` status and is picked up by the
/// scheduler on its next poll.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitJob>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let job = state.store.create(&input).await?;

    tracing::info!(
        job_id = job.id,
        job_type = %job.job_type,
        priority = job.priority,
        "Job submitted",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// List jobs, newest first. Supports optional `status_id`, `job_type`,
/// `limit`, and `offset` query parameters.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.store.list(&params).await?;

    Ok(Json(DataResponse { data: jobs }))
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Scheduler slice of the stats payload.
#[derive(Serialize)]
pub struct SchedulerStatus {
    /// Lifecycle state of this instance's poll loop.
    pub state: &'static str,
    /// Jobs currently executing on this instance.
    pub in_flight: usize,
}

/// Response payload for the stats endpoint.
#[derive(Serialize)]
pub struct QueueStats {
    /// Job counts per status.
    pub jobs: JobStats,
    /// Total jobs across all statuses.
    pub total: i64,
    pub scheduler: SchedulerStatus,
}

/// GET /api/v1/jobs/stats
///
/// Queue counts per status plus this instance's scheduler state.
pub async fn job_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let jobs = state.store.count_by_status().await?;
    let total = jobs.total();

    let stats = QueueStats {
        jobs,
        total,
        scheduler: SchedulerStatus {
            state: state.scheduler.state().await.as_str(),
            in_flight: state.scheduler.in_flight_count().await,
        },
    };

    Ok(Json(DataResponse { data: stats }))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}
///
/// Get a single job by ID.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(state.store.as_ref(), job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}/logs
///
/// The job's audit trail, oldest first. 404 if the job does not exist.
pub async fn job_logs(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_job(state.store.as_ref(), job_id).await?;
    let logs = state.store.list_logs(job_id).await?;

    Ok(Json(DataResponse { data: logs }))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/cancel
///
/// Cancel a pending job. Returns 204 on success and on repeat cancels
/// (cancellation is idempotent); 409 if the job is running or already
/// finished.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(state.store.as_ref(), job_id).await?;
    if job.status() == Some(JobStatus::Cancelled) {
        return Ok(StatusCode::NO_CONTENT);
    }

    let cancelled = state.store.cancel(job_id).await?;
    if !cancelled {
        // Lost a race or the job was never cancellable; report its
        // current status.
        let job = find_job(state.store.as_ref(), job_id).await?;
        if job.status() == Some(JobStatus::Cancelled) {
            return Ok(StatusCode::NO_CONTENT);
        }
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Job {job_id} is {} and cannot be cancelled",
            status_name(job.status_id).to_lowercase(),
        ))));
    }

    state
        .store
        .append_log(job_id, ACTION_CANCELLED, &serde_json::json!({}))
        .await?;

    tracing::info!(job_id, "Job cancelled");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Run now
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/run
///
/// Promote a scheduled pending job to run on the next poll by clearing
/// its `next_run_at`. Returns 202 with the refreshed job; 409 if the
/// job is not pending.
pub async fn run_job_now(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(state.store.as_ref(), job_id).await?;

    let promoted = state.store.run_now(job_id).await?;
    if !promoted {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Job {job_id} is {} and cannot be run; only pending jobs can",
            status_name(job.status_id).to_lowercase(),
        ))));
    }

    tracing::info!(job_id, "Job promoted to run now");

    let job = find_job(state.store.as_ref(), job_id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: job })))
}
