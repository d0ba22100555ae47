//! Scheduler lock record.

use conveyor_core::types::Timestamp;

/// A named mutual-exclusion lock row.
///
/// `locked_at` is the only liveness signal: a record whose timestamp is
/// older than the staleness threshold is presumed abandoned by a crashed
/// owner and may be seized.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LockRecord {
    pub name: String,
    pub owner: String,
    pub locked_at: Timestamp,
}
