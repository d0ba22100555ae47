//! In-memory store implementations.
//!
//! Mirror the observable semantics of the Postgres stores so the
//! scheduler, executor, and HTTP tests run without a database. Also
//! usable embedded, for hosts that want the engine without Postgres.
//!
//! Time comes from the injected [`Clock`], so tests can pin `created_at`
//! and `updated_at` exactly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use conveyor_core::clock::Clock;
use conveyor_core::types::{DbId, Timestamp};
use tokio::sync::Mutex;

use crate::models::job::{Job, JobListQuery, JobStats, SubmitJob};
use crate::models::job_log::JobLog;
use crate::models::lock::LockRecord;
use crate::models::status::JobStatus;
use crate::store::{JobStore, LockStore, PurgeCounts, StoreError};

/// In-memory job store.
pub struct MemoryJobStore {
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

struct Inner {
    jobs: HashMap<DbId, Job>,
    logs: Vec<JobLog>,
    next_job_id: DbId,
    next_log_id: DbId,
}

impl MemoryJobStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner {
                jobs: HashMap::new(),
                logs: Vec::new(),
                next_job_id: 1,
                next_log_id: 1,
            }),
        }
    }
}

impl Inner {
    fn update_status(
        &mut self,
        id: DbId,
        expected: JobStatus,
        now: Timestamp,
    ) -> Result<&mut Job, StoreError> {
        let job = self
            .jobs
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "Job", id })?;
        if job.status_id != expected.id() {
            return Err(StoreError::Conflict(format!(
                "Job {id} is not {}",
                conveyor_core::jobs::state_machine::status_name(expected.id()).to_lowercase()
            )));
        }
        job.updated_at = now;
        Ok(job)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, input: &SubmitJob) -> Result<Job, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        let id = inner.next_job_id;
        inner.next_job_id += 1;

        let job = Job {
            id,
            job_type: input.job_type.clone(),
            payload: input.payload.clone(),
            priority: input.priority_or_default(),
            max_retries: input.max_retries_or_default(),
            timeout_ms: input.timeout_ms_or_default(),
            status_id: JobStatus::Pending.id(),
            attempts: 0,
            next_run_at: input.scheduled_at,
            started_at: None,
            completed_at: None,
            failed_at: None,
            result: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        inner.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn fetch_due(&self, limit: i64, now: Timestamp) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.lock().await;
        let mut due: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| {
                job.status_id == JobStatus::Pending.id()
                    && job.next_run_at.map_or(true, |at| at <= now)
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn mark_running(&self, id: DbId) -> Result<Job, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        let job = inner.update_status(id, JobStatus::Pending, now)?;
        job.status_id = JobStatus::Running.id();
        job.attempts += 1;
        job.started_at = Some(now);
        Ok(job.clone())
    }

    async fn mark_completed(
        &self,
        id: DbId,
        result: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        let job = inner.update_status(id, JobStatus::Running, now)?;
        job.status_id = JobStatus::Completed.id();
        job.result = Some(result.clone());
        job.completed_at = Some(now);
        Ok(())
    }

    async fn schedule_retry(
        &self,
        id: DbId,
        next_run_at: Timestamp,
        error: &str,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        let job = inner.update_status(id, JobStatus::Running, now)?;
        job.status_id = JobStatus::Pending.id();
        job.next_run_at = Some(next_run_at);
        job.last_error = Some(error.to_string());
        Ok(())
    }

    async fn mark_failed(&self, id: DbId, error: &str) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        let job = inner.update_status(id, JobStatus::Running, now)?;
        job.status_id = JobStatus::Failed.id();
        job.last_error = Some(error.to_string());
        job.failed_at = Some(now);
        Ok(())
    }

    async fn cancel(&self, id: DbId) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        match inner.jobs.get_mut(&id) {
            Some(job) if job.status_id == JobStatus::Pending.id() => {
                job.status_id = JobStatus::Cancelled.id();
                job.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn run_now(&self, id: DbId) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        match inner.jobs.get_mut(&id) {
            Some(job) if job.status_id == JobStatus::Pending.id() => {
                job.next_run_at = None;
                job.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_log(
        &self,
        job_id: DbId,
        action: &str,
        details: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        let id = inner.next_log_id;
        inner.next_log_id += 1;
        inner.logs.push(JobLog {
            id,
            job_id,
            action: action.to_string(),
            details: details.clone(),
            created_at: now,
        });
        Ok(())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.jobs.get(&id).cloned())
    }

    async fn list(&self, query: &JobListQuery) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.lock().await;
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| {
                query.status_id.map_or(true, |s| job.status_id == s)
                    && query.job_type.as_ref().map_or(true, |t| &job.job_type == t)
            })
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(jobs
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect())
    }

    async fn list_logs(&self, job_id: DbId) -> Result<Vec<JobLog>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .logs
            .iter()
            .filter(|log| log.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn count_by_status(&self) -> Result<JobStats, StoreError> {
        let inner = self.inner.lock().await;
        let mut stats = JobStats::default();
        for job in inner.jobs.values() {
            match JobStatus::from_id(job.status_id) {
                Some(JobStatus::Pending) => stats.pending += 1,
                Some(JobStatus::Running) => stats.running += 1,
                Some(JobStatus::Completed) => stats.completed += 1,
                Some(JobStatus::Failed) => stats.failed += 1,
                Some(JobStatus::Cancelled) => stats.cancelled += 1,
                None => {}
            }
        }
        Ok(stats)
    }

    async fn purge_older_than(&self, cutoff: Timestamp) -> Result<PurgeCounts, StoreError> {
        let mut inner = self.inner.lock().await;

        let before_jobs = inner.jobs.len();
        inner.jobs.retain(|_, job| {
            let terminal = JobStatus::from_id(job.status_id).is_some_and(JobStatus::is_terminal);
            !(terminal && job.updated_at < cutoff)
        });
        let jobs = (before_jobs - inner.jobs.len()) as u64;

        let before_logs = inner.logs.len();
        inner.logs.retain(|log| log.created_at >= cutoff);
        let logs = (before_logs - inner.logs.len()) as u64;

        Ok(PurgeCounts { jobs, logs })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-memory lock store. The single mutex makes every operation atomic,
/// so concurrent acquires resolve to exactly one winner.
#[derive(Default)]
pub struct MemoryLockStore {
    locks: Mutex<HashMap<String, LockRecord>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn find(&self, name: &str) -> Result<Option<LockRecord>, StoreError> {
        let locks = self.locks.lock().await;
        Ok(locks.get(name).cloned())
    }

    async fn try_insert(
        &self,
        name: &str,
        owner: &str,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut locks = self.locks.lock().await;
        if locks.contains_key(name) {
            return Ok(false);
        }
        locks.insert(
            name.to_string(),
            LockRecord {
                name: name.to_string(),
                owner: owner.to_string(),
                locked_at: now,
            },
        );
        Ok(true)
    }

    async fn try_takeover(
        &self,
        name: &str,
        owner: &str,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut locks = self.locks.lock().await;
        match locks.get_mut(name) {
            Some(record) if record.locked_at < stale_before => {
                record.owner = owner.to_string();
                record.locked_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, name: &str, owner: &str) -> Result<bool, StoreError> {
        let mut locks = self.locks.lock().await;
        match locks.get(name) {
            Some(record) if record.owner == owner => {
                locks.remove(name);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
