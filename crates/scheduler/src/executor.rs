//! Single-job execution.
//!
//! [`Executor::run`] drives one attempt end to end: claim the job,
//! race its handler against the job's timeout, then record completion,
//! a scheduled retry, or permanent failure. It never propagates errors
//! to the caller; a handler failure is a scheduling decision, not a
//! scheduler crash, and bookkeeping errors are logged and absorbed.

use std::sync::Arc;
use std::time::Instant;

use conveyor_core::clock::Clock;
use conveyor_core::jobs::{ACTION_COMPLETED, ACTION_FAILED, ACTION_RETRY_SCHEDULED};
use conveyor_core::retry::{RetryDecision, RetryPolicy};
use conveyor_core::types::Timestamp;
use conveyor_db::models::job::Job;
use conveyor_db::{JobStore, StoreError};

use crate::registry::{HandlerRegistry, JobContext};

/// How one attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Handler succeeded; job is completed with its result stored.
    Completed,
    /// Attempt failed; job is pending again with a future `next_run_at`.
    Retrying { next_run_at: Timestamp },
    /// Attempt failed with no retry budget left; job is failed.
    Failed,
    /// Job was no longer claimable (cancelled or taken elsewhere).
    Skipped,
}

pub struct Executor {
    store: Arc<dyn JobStore>,
    registry: Arc<HandlerRegistry>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl Executor {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<HandlerRegistry>,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            retry,
            clock,
        }
    }

    /// Run one attempt of `job`.
    pub async fn run(&self, job: Job) -> ExecutionOutcome {
        // Claim the job. Losing the claim is routine (the job was
        // cancelled, or another tick picked it up first).
        let running = match self.store.mark_running(job.id).await {
            Ok(running) => running,
            Err(StoreError::Conflict(_)) | Err(StoreError::NotFound { .. }) => {
                tracing::debug!(job_id = job.id, "Job no longer claimable, skipping");
                return ExecutionOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!(job_id = job.id, error = %e, "Failed to claim job");
                return ExecutionOutcome::Skipped;
            }
        };

        let Some(handler) = self.registry.resolve(&running.job_type) else {
            let error = format!(
                "No handler registered for job type '{}'",
                running.job_type
            );
            return self.record_failure(&running, error).await;
        };

        tracing::debug!(
            job_id = running.id,
            job_type = %running.job_type,
            attempt = running.attempts,
            "Job attempt started"
        );

        let started = Instant::now();
        let ctx = JobContext {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        };
        let handler_job = running.clone();
        let mut handle = tokio::spawn(async move { handler.run(handler_job, ctx).await });

        match tokio::time::timeout(running.timeout(), &mut handle).await {
            Ok(Ok(Ok(result))) => self.record_success(&running, result, started).await,
            Ok(Ok(Err(error))) => self.record_failure(&running, format!("{error:#}")).await,
            Ok(Err(join_error)) => {
                let error = if join_error.is_panic() {
                    "Handler panicked".to_string()
                } else {
                    "Handler task aborted".to_string()
                };
                self.record_failure(&running, error).await
            }
            Err(_elapsed) => {
                handle.abort();
                let error = format!("Handler timed out after {}ms", running.timeout_ms);
                self.record_failure(&running, error).await
            }
        }
    }

    async fn record_success(
        &self,
        job: &Job,
        result: serde_json::Value,
        started: Instant,
    ) -> ExecutionOutcome {
        let duration_ms = started.elapsed().as_millis() as u64;

        if let Err(e) = self.store.mark_completed(job.id, &result).await {
            tracing::error!(job_id = job.id, error = %e, "Failed to record job completion");
        }
        let details = serde_json::json!({
            "attempt": job.attempts,
            "duration_ms": duration_ms,
            "result": result,
        });
        if let Err(e) = self.store.append_log(job.id, ACTION_COMPLETED, &details).await {
            tracing::error!(job_id = job.id, error = %e, "Failed to append completion log");
        }

        tracing::info!(
            job_id = job.id,
            job_type = %job.job_type,
            attempt = job.attempts,
            duration_ms,
            "Job completed"
        );
        ExecutionOutcome::Completed
    }

    async fn record_failure(&self, job: &Job, error: String) -> ExecutionOutcome {
        match self
            .retry
            .decide(job.attempts, job.max_retries, self.clock.now())
        {
            RetryDecision::Retry { next_run_at } => {
                if let Err(e) = self.store.schedule_retry(job.id, next_run_at, &error).await {
                    tracing::error!(job_id = job.id, error = %e, "Failed to schedule retry");
                }
                let details = serde_json::json!({
                    "attempt": job.attempts,
                    "error": error,
                    "next_run_at": next_run_at,
                });
                if let Err(e) = self
                    .store
                    .append_log(job.id, ACTION_RETRY_SCHEDULED, &details)
                    .await
                {
                    tracing::error!(job_id = job.id, error = %e, "Failed to append retry log");
                }

                tracing::warn!(
                    job_id = job.id,
                    job_type = %job.job_type,
                    attempt = job.attempts,
                    max_retries = job.max_retries,
                    error = %error,
                    next_run_at = %next_run_at,
                    "Job attempt failed, retry scheduled"
                );
                ExecutionOutcome::Retrying { next_run_at }
            }
            RetryDecision::Exhausted => {
                if let Err(e) = self.store.mark_failed(job.id, &error).await {
                    tracing::error!(job_id = job.id, error = %e, "Failed to record job failure");
                }
                let details = serde_json::json!({
                    "attempt": job.attempts,
                    "error": error,
                });
                if let Err(e) = self.store.append_log(job.id, ACTION_FAILED, &details).await {
                    tracing::error!(job_id = job.id, error = %e, "Failed to append failure log");
                }

                tracing::error!(
                    job_id = job.id,
                    job_type = %job.job_type,
                    attempt = job.attempts,
                    error = %error,
                    "Job failed permanently"
                );
                ExecutionOutcome::Failed
            }
        }
    }
}
