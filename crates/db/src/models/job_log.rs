//! Append-only job execution log rows.

use conveyor_core::types::{DbId, Timestamp};
use serde::Serialize;

/// One audit entry for a job lifecycle action.
///
/// Rows are append-only and never updated. `job_id` is a weak reference:
/// a log row may outlive its job (retention prunes the two independently),
/// so readers must not assume the job still exists.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct JobLog {
    pub id: DbId,
    pub job_id: DbId,
    /// One of the `ACTION_*` constants from `conveyor_core::jobs`.
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: Timestamp,
}
