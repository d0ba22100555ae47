//! Retention cleanup handler.
//!
//! Deletes terminal jobs and audit log rows older than a retention
//! window. Runs through the engine like any other job, so cleanup
//! itself is visible, retryable, and audited.

use async_trait::async_trait;
use chrono::Duration;
use conveyor_db::models::job::Job;
use serde::Deserialize;

use crate::registry::{JobContext, JobHandler};

/// Job type string the handler registers under.
pub const CLEANUP_JOB_TYPE: &str = "cleanup_old_data";

const DEFAULT_DAYS_TO_KEEP: i64 = 90;

/// Payload for [`CleanupHandler`]. Accepts both `days_to_keep` and the
/// legacy `daysToKeep` spelling.
#[derive(Debug, Deserialize)]
struct CleanupParams {
    #[serde(default = "default_days_to_keep", alias = "daysToKeep")]
    days_to_keep: i64,
}

fn default_days_to_keep() -> i64 {
    DEFAULT_DAYS_TO_KEEP
}

/// Purges terminal jobs and logs older than the retention window.
pub struct CleanupHandler;

#[async_trait]
impl JobHandler for CleanupHandler {
    async fn run(&self, job: Job, ctx: JobContext) -> anyhow::Result<serde_json::Value> {
        let params: CleanupParams = serde_json::from_value(job.payload)?;
        anyhow::ensure!(
            params.days_to_keep > 0,
            "days_to_keep must be positive, got {}",
            params.days_to_keep
        );

        let cutoff = ctx.clock.now() - Duration::days(params.days_to_keep);
        let purged = ctx.store.purge_older_than(cutoff).await?;

        tracing::info!(
            days_to_keep = params.days_to_keep,
            cutoff = %cutoff,
            purged_jobs = purged.jobs,
            purged_logs = purged.logs,
            "Retention cleanup finished"
        );

        Ok(serde_json::json!({
            "cleaned": purged.jobs + purged.logs,
            "jobs": purged.jobs,
            "logs": purged.logs,
            "cutoff": cutoff,
        }))
    }
}
