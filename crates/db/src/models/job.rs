//! Job row model and request/query DTOs.

use conveyor_core::error::CoreError;
use conveyor_core::jobs::{
    validate_job_type, validate_max_retries, validate_timeout_ms, DEFAULT_MAX_RETRIES,
    DEFAULT_TIMEOUT_MS, PRIORITY_NORMAL,
};
use conveyor_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::models::status::{JobStatus, StatusId};

/// Default page size for job listings.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Upper bound on the page size for job listings.
pub const MAX_LIST_LIMIT: i64 = 200;

/// A background job row.
///
/// `payload` is opaque JSON owned by the handler for the job's type;
/// the engine never inspects it. `result` and `last_error` carry the
/// outcome of the most recent attempt.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub max_retries: i32,
    pub timeout_ms: i32,
    pub status_id: StatusId,
    pub attempts: i32,
    /// Earliest instant the job may be dispatched; `None` means
    /// immediately due.
    pub next_run_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub failed_at: Option<Timestamp>,
    pub result: Option<serde_json::Value>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Per-attempt handler timeout as a `Duration`.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms.max(1) as u64)
    }

    /// The status enum, if the raw ID is a known status.
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::from_id(self.status_id)
    }
}

/// Payload for creating a job.
///
/// Optional fields fall back to the submission defaults: priority 0,
/// three retries, a 60-second timeout, and no scheduling delay.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitJob {
    pub job_type: String,
    #[serde(default = "empty_payload")]
    pub payload: serde_json::Value,
    pub priority: Option<i32>,
    pub max_retries: Option<i32>,
    pub timeout_ms: Option<i32>,
    /// When set, the job stays invisible to the dispatcher until this
    /// instant.
    pub scheduled_at: Option<Timestamp>,
}

fn empty_payload() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl SubmitJob {
    /// Validate the submission against the domain rules.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_job_type(&self.job_type)?;
        if let Some(max_retries) = self.max_retries {
            validate_max_retries(max_retries)?;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            validate_timeout_ms(timeout_ms)?;
        }
        Ok(())
    }

    pub fn priority_or_default(&self) -> i32 {
        self.priority.unwrap_or(PRIORITY_NORMAL)
    }

    pub fn max_retries_or_default(&self) -> i32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn timeout_ms_or_default(&self) -> i32 {
        self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }
}

/// Query parameters for listing jobs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    pub status_id: Option<StatusId>,
    pub job_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl JobListQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Per-status job counts for the stats endpoint.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow, Serialize)]
pub struct JobStats {
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
}

impl JobStats {
    pub fn total(&self) -> i64 {
        self.pending + self.running + self.completed + self.failed + self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(job_type: &str) -> SubmitJob {
        SubmitJob {
            job_type: job_type.to_string(),
            payload: empty_payload(),
            priority: None,
            max_retries: None,
            timeout_ms: None,
            scheduled_at: None,
        }
    }

    // -- SubmitJob defaults ---------------------------------------------------

    #[test]
    fn submission_defaults() {
        let input = submit("send_email");
        assert_eq!(input.priority_or_default(), 0);
        assert_eq!(input.max_retries_or_default(), 3);
        assert_eq!(input.timeout_ms_or_default(), 60_000);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let input = SubmitJob {
            priority: Some(10),
            max_retries: Some(0),
            timeout_ms: Some(100),
            ..submit("send_email")
        };
        assert_eq!(input.priority_or_default(), 10);
        assert_eq!(input.max_retries_or_default(), 0);
        assert_eq!(input.timeout_ms_or_default(), 100);
    }

    // -- SubmitJob validation -------------------------------------------------

    #[test]
    fn valid_submission_passes() {
        assert!(submit("send_email").validate().is_ok());
    }

    #[test]
    fn invalid_job_type_rejected() {
        assert!(submit("Send Email").validate().is_err());
    }

    #[test]
    fn invalid_max_retries_rejected() {
        let input = SubmitJob {
            max_retries: Some(-1),
            ..submit("send_email")
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn invalid_timeout_rejected() {
        let input = SubmitJob {
            timeout_ms: Some(0),
            ..submit("send_email")
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn missing_payload_deserializes_to_empty_object() {
        let input: SubmitJob = serde_json::from_str(r#"{"job_type":"send_email"}"#).unwrap();
        assert_eq!(input.payload, serde_json::json!({}));
    }

    // -- JobListQuery ---------------------------------------------------------

    #[test]
    fn list_query_defaults() {
        let query = JobListQuery::default();
        assert_eq!(query.limit(), DEFAULT_LIST_LIMIT);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn list_query_clamps_limit() {
        let query = JobListQuery {
            limit: Some(10_000),
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(query.limit(), MAX_LIST_LIMIT);
        assert_eq!(query.offset(), 0);
    }

    // -- JobStats -------------------------------------------------------------

    #[test]
    fn stats_total_sums_all_statuses() {
        let stats = JobStats {
            pending: 1,
            running: 2,
            completed: 3,
            failed: 4,
            cancelled: 5,
        };
        assert_eq!(stats.total(), 15);
    }
}
