//! Postgres implementation of [`JobStore`] over the `jobs` and `job_logs`
//! tables.
//!
//! Uses the `JobStatus` enum from `models::status` for all status
//! transitions. No magic numbers — every status literal is a named
//! constant. Status transitions are conditional UPDATEs so a row that
//! raced into another state is reported as a conflict, never overwritten.

use async_trait::async_trait;
use conveyor_core::types::{DbId, Timestamp};

use crate::models::job::{Job, JobListQuery, JobStats, SubmitJob};
use crate::models::job_log::JobLog;
use crate::models::status::{JobStatus, StatusId};
use crate::store::{JobStore, PurgeCounts, StoreError};
use crate::DbPool;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, job_type, payload, priority, max_retries, timeout_ms, \
    status_id, attempts, next_run_at, started_at, completed_at, \
    failed_at, result, last_error, created_at, updated_at";

/// Terminal statuses: completed, failed, cancelled.
const TERMINAL_STATUSES: [StatusId; 3] = [
    JobStatus::Completed as StatusId,
    JobStatus::Failed as StatusId,
    JobStatus::Cancelled as StatusId,
];

/// Postgres job store.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, input: &SubmitJob) -> Result<Job, StoreError> {
        let query = format!(
            "INSERT INTO jobs (job_type, status_id, payload, priority, max_retries, timeout_ms, next_run_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(&input.job_type)
            .bind(JobStatus::Pending.id())
            .bind(&input.payload)
            .bind(input.priority_or_default())
            .bind(input.max_retries_or_default())
            .bind(input.timeout_ms_or_default())
            .bind(input.scheduled_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(job)
    }

    async fn fetch_due(&self, limit: i64, now: Timestamp) -> Result<Vec<Job>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status_id = $1 AND (next_run_at IS NULL OR next_run_at <= $2) \
             ORDER BY priority DESC, created_at ASC, id ASC \
             LIMIT $3"
        );
        let jobs = sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Pending.id())
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(jobs)
    }

    async fn mark_running(&self, id: DbId) -> Result<Job, StoreError> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, attempts = attempts + 1, started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(JobStatus::Running.id())
            .bind(JobStatus::Pending.id())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::Conflict(format!("Job {id} is not pending")))
    }

    async fn mark_completed(
        &self,
        id: DbId,
        result: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let rows = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, result = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(JobStatus::Completed.id())
        .bind(result)
        .bind(JobStatus::Running.id())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(StoreError::Conflict(format!("Job {id} is not running")));
        }
        Ok(())
    }

    async fn schedule_retry(
        &self,
        id: DbId,
        next_run_at: Timestamp,
        error: &str,
    ) -> Result<(), StoreError> {
        let rows = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, next_run_at = $3, last_error = $4, updated_at = NOW() \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(id)
        .bind(JobStatus::Pending.id())
        .bind(next_run_at)
        .bind(error)
        .bind(JobStatus::Running.id())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(StoreError::Conflict(format!("Job {id} is not running")));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: DbId, error: &str) -> Result<(), StoreError> {
        let rows = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, last_error = $3, failed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(JobStatus::Failed.id())
        .bind(error)
        .bind(JobStatus::Running.id())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(StoreError::Conflict(format!("Job {id} is not running")));
        }
        Ok(())
    }

    async fn cancel(&self, id: DbId) -> Result<bool, StoreError> {
        let rows = sqlx::query(
            "UPDATE jobs SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(JobStatus::Cancelled.id())
        .bind(JobStatus::Pending.id())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn run_now(&self, id: DbId) -> Result<bool, StoreError> {
        let rows = sqlx::query(
            "UPDATE jobs SET next_run_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(id)
        .bind(JobStatus::Pending.id())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn append_log(
        &self,
        job_id: DbId,
        action: &str,
        details: &serde_json::Value,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO job_logs (job_id, action, details) VALUES ($1, $2, $3)")
            .bind(job_id)
            .bind(action)
            .bind(details)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn list(&self, params: &JobListQuery) -> Result<Vec<Job>, StoreError> {
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx = 1;

        if params.status_id.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if params.job_type.is_some() {
            conditions.push(format!("job_type = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM jobs {where_clause}\
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let mut q = sqlx::query_as::<_, Job>(&query);
        if let Some(status_id) = params.status_id {
            q = q.bind(status_id);
        }
        if let Some(job_type) = &params.job_type {
            q = q.bind(job_type);
        }
        let jobs = q
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(jobs)
    }

    async fn list_logs(&self, job_id: DbId) -> Result<Vec<JobLog>, StoreError> {
        let logs = sqlx::query_as::<_, JobLog>(
            "SELECT id, job_id, action, details, created_at FROM job_logs \
             WHERE job_id = $1 \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn count_by_status(&self) -> Result<JobStats, StoreError> {
        let stats = sqlx::query_as::<_, JobStats>(
            "SELECT \
                 COUNT(*) FILTER (WHERE status_id = $1) AS pending, \
                 COUNT(*) FILTER (WHERE status_id = $2) AS running, \
                 COUNT(*) FILTER (WHERE status_id = $3) AS completed, \
                 COUNT(*) FILTER (WHERE status_id = $4) AS failed, \
                 COUNT(*) FILTER (WHERE status_id = $5) AS cancelled \
             FROM jobs",
        )
        .bind(JobStatus::Pending.id())
        .bind(JobStatus::Running.id())
        .bind(JobStatus::Completed.id())
        .bind(JobStatus::Failed.id())
        .bind(JobStatus::Cancelled.id())
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn purge_older_than(&self, cutoff: Timestamp) -> Result<PurgeCounts, StoreError> {
        let jobs = sqlx::query(
            "DELETE FROM jobs WHERE status_id = ANY($1) AND updated_at < $2",
        )
        .bind(&TERMINAL_STATUSES[..])
        .bind(cutoff)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let logs = sqlx::query("DELETE FROM job_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(PurgeCounts { jobs, logs })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
