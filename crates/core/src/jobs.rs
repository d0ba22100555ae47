//! Job domain constants, validation, and the status state machine.
//!
//! Pure functions and constants used by the persistence layer, the
//! scheduler, and the API. Lives in `core` to maintain the zero internal
//! dependency constraint.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Priority constants
// ---------------------------------------------------------------------------

/// Priority value for urgent jobs. Dispatched before all others.
pub const PRIORITY_URGENT: i32 = 10;

/// Priority value for normal jobs. Default.
pub const PRIORITY_NORMAL: i32 = 0;

/// Priority value for background jobs. Dispatched last.
pub const PRIORITY_BACKGROUND: i32 = -10;

// ---------------------------------------------------------------------------
// Defaults and limits
// ---------------------------------------------------------------------------

/// Default number of automatic retries after a failed attempt.
pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// Upper bound on `max_retries` accepted at submission.
pub const MAX_MAX_RETRIES: i32 = 10;

/// Default per-attempt handler timeout (60 seconds).
pub const DEFAULT_TIMEOUT_MS: i32 = 60_000;

/// Upper bound on the per-attempt timeout (1 hour).
pub const MAX_TIMEOUT_MS: i32 = 3_600_000;

/// Maximum length of a job type name.
const MAX_JOB_TYPE_LEN: usize = 100;

// ---------------------------------------------------------------------------
// Job log actions
// ---------------------------------------------------------------------------

/// A handler finished successfully; details carry the attempt and result.
pub const ACTION_COMPLETED: &str = "completed";

/// An attempt failed and a retry was scheduled; details carry the attempt,
/// the error, and the next run time.
pub const ACTION_RETRY_SCHEDULED: &str = "retry_scheduled";

/// An attempt failed with retries exhausted; the job is terminally failed.
pub const ACTION_FAILED: &str = "failed";

/// A pending job was cancelled through the management surface.
pub const ACTION_CANCELLED: &str = "cancelled";

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a job type name.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_JOB_TYPE_LEN` characters.
/// - Must contain only lowercase alphanumeric, hyphen, underscore, or dot
///   characters (job types are registry keys, not display strings).
pub fn validate_job_type(job_type: &str) -> Result<(), CoreError> {
    if job_type.is_empty() {
        return Err(CoreError::Validation(
            "Job type must not be empty".to_string(),
        ));
    }
    if job_type.len() > MAX_JOB_TYPE_LEN {
        return Err(CoreError::Validation(format!(
            "Job type must not exceed {MAX_JOB_TYPE_LEN} characters"
        )));
    }
    if !job_type
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(
            "Job type may only contain lowercase alphanumeric, hyphen, underscore, or dot characters"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate a `max_retries` value (0 disables automatic retries).
pub fn validate_max_retries(max_retries: i32) -> Result<(), CoreError> {
    if !(0..=MAX_MAX_RETRIES).contains(&max_retries) {
        return Err(CoreError::Validation(format!(
            "max_retries must be between 0 and {MAX_MAX_RETRIES}"
        )));
    }
    Ok(())
}

/// Validate a per-attempt timeout in milliseconds.
pub fn validate_timeout_ms(timeout_ms: i32) -> Result<(), CoreError> {
    if timeout_ms <= 0 {
        return Err(CoreError::Validation(
            "timeout_ms must be positive".to_string(),
        ));
    }
    if timeout_ms > MAX_TIMEOUT_MS {
        return Err(CoreError::Validation(format!(
            "timeout_ms must not exceed {MAX_TIMEOUT_MS}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Job status IDs matching `job_statuses` seed data (1-based SMALLSERIAL).
///
/// The state machine is intentionally duplicated from the `db` crate's
/// `JobStatus` enum because `core` must have zero internal deps.
pub mod state_machine {
    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// Terminal states (Completed=3, Failed=4, Cancelled=5) return an empty
    /// slice because no further transitions are allowed. Retry is the
    /// Running -> Pending edge; a retried job is pending with a future
    /// `next_run_at`, never a distinct status.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Pending -> Running, Cancelled
            1 => &[2, 5],
            // Running -> Completed, Failed, Pending (retry)
            2 => &[3, 4, 1],
            // Terminal states: Completed, Failed, Cancelled
            3 | 4 | 5 => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            let from_name = status_name(from);
            let to_name = status_name(to);
            Err(format!(
                "Invalid transition: {from_name} ({from}) -> {to_name} ({to})"
            ))
        }
    }

    /// Human-readable name for a status ID (for error messages).
    pub fn status_name(id: i16) -> &'static str {
        match id {
            1 => "Pending",
            2 => "Running",
            3 => "Completed",
            4 => "Failed",
            5 => "Cancelled",
            _ => "Unknown",
        }
    }
}
