//! Storage trait seams for jobs and locks.
//!
//! The scheduler is written against these traits so the backing store is a
//! constructor-injected collaborator: Postgres in production
//! ([`crate::postgres`]), in-memory for tests and embedded use
//! ([`crate::memory`]).

use async_trait::async_trait;
use conveyor_core::types::{DbId, Timestamp};
use serde::Serialize;

use crate::models::job::{Job, JobListQuery, JobStats, SubmitJob};
use crate::models::job_log::JobLog;
use crate::models::lock::LockRecord;

/// Error type shared by all store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Rows removed by a retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeCounts {
    pub jobs: u64,
    pub logs: u64,
}

/// Persistence operations for jobs and their append-only logs.
///
/// Status-changing operations are conditional on the current status
/// (`mark_running` only moves pending jobs, `mark_completed` only running
/// ones, and so on); a job that is no longer in the expected state yields
/// [`StoreError::Conflict`] rather than a silent overwrite. That guard is
/// what keeps concurrent schedulers merely at-least-once instead of
/// corrupting state.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new pending job, applying submission defaults.
    /// `scheduled_at` becomes the initial `next_run_at`.
    async fn create(&self, input: &SubmitJob) -> Result<Job, StoreError>;

    /// Pending jobs that are due at `now` (`next_run_at` null or `<= now`),
    /// ordered by `priority DESC, created_at ASC`, at most `limit` rows.
    /// Never returns a job scheduled in the future.
    async fn fetch_due(&self, limit: i64, now: Timestamp) -> Result<Vec<Job>, StoreError>;

    /// Transition pending -> running: increments `attempts`, sets
    /// `started_at`, and returns the updated row.
    async fn mark_running(&self, id: DbId) -> Result<Job, StoreError>;

    /// Transition running -> completed with the handler's result.
    async fn mark_completed(&self, id: DbId, result: &serde_json::Value)
        -> Result<(), StoreError>;

    /// Transition running -> pending for a retry at `next_run_at`,
    /// recording the error that caused it.
    async fn schedule_retry(
        &self,
        id: DbId,
        next_run_at: Timestamp,
        error: &str,
    ) -> Result<(), StoreError>;

    /// Transition running -> failed (terminal), recording the error.
    async fn mark_failed(&self, id: DbId, error: &str) -> Result<(), StoreError>;

    /// Cancel a pending job. Returns false (without error) when the job is
    /// not pending, which makes repeated cancels idempotent.
    async fn cancel(&self, id: DbId) -> Result<bool, StoreError>;

    /// Clear `next_run_at` on a pending job so the next dispatch tick picks
    /// it up. Returns false when the job is not pending.
    async fn run_now(&self, id: DbId) -> Result<bool, StoreError>;

    /// Append one immutable log row for a job.
    async fn append_log(
        &self,
        job_id: DbId,
        action: &str,
        details: &serde_json::Value,
    ) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<Job>, StoreError>;

    async fn list(&self, query: &JobListQuery) -> Result<Vec<Job>, StoreError>;

    /// Log rows for one job, oldest first.
    async fn list_logs(&self, job_id: DbId) -> Result<Vec<JobLog>, StoreError>;

    /// Per-status job counts.
    async fn count_by_status(&self) -> Result<JobStats, StoreError>;

    /// Delete terminal jobs and log rows older than `cutoff`. Only the
    /// cleanup handler calls this; the engine itself never deletes.
    async fn purge_older_than(&self, cutoff: Timestamp) -> Result<PurgeCounts, StoreError>;

    /// Cheap connectivity probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Persistence operations for named mutual-exclusion locks.
///
/// `try_insert` and `try_takeover` must be atomic in each implementation:
/// of two concurrent callers, exactly one observes success. The
/// staleness *policy* (threshold, warning) lives in the scheduler's
/// `LockManager`; the store only executes the conditional writes.
#[async_trait]
pub trait LockStore: Send + Sync {
    async fn find(&self, name: &str) -> Result<Option<LockRecord>, StoreError>;

    /// Create the lock record iff absent. Returns whether this call won.
    async fn try_insert(&self, name: &str, owner: &str, now: Timestamp)
        -> Result<bool, StoreError>;

    /// Replace the lock record iff its `locked_at` is older than
    /// `stale_before`. Returns whether this call won.
    async fn try_takeover(
        &self,
        name: &str,
        owner: &str,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Delete the record iff held by `owner`. Returns false when there was
    /// nothing to release; never an error.
    async fn release(&self, name: &str, owner: &str) -> Result<bool, StoreError>;
}
