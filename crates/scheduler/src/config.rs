use uuid::Uuid;

/// Scheduler configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Fixed delay between poll ticks, in milliseconds (default: `1000`).
    pub poll_interval_ms: u64,
    /// Maximum jobs fetched per tick (default: `10`).
    pub batch_size: i64,
    /// Maximum jobs executing at once (default: `4`).
    pub max_concurrent: usize,
    /// Age at which a foreign lock is considered abandoned, in seconds
    /// (default: `300`).
    pub lock_stale_secs: i64,
    /// Lock owner identity. Defaults to a per-process `scheduler-<uuid>`
    /// so two instances never claim to be the same owner.
    pub lock_owner: String,
    /// Base delay for exponential retry backoff, in milliseconds
    /// (default: `30000`).
    pub retry_base_delay_ms: u64,
    /// How long graceful shutdown waits for in-flight jobs, in seconds
    /// (default: `30`).
    pub drain_timeout_secs: u64,
}

impl SchedulerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default              |
    /// |---------------------------------|----------------------|
    /// | `SCHEDULER_POLL_INTERVAL_MS`    | `1000`               |
    /// | `SCHEDULER_BATCH_SIZE`          | `10`                 |
    /// | `SCHEDULER_MAX_CONCURRENT`      | `4`                  |
    /// | `SCHEDULER_LOCK_STALE_SECS`     | `300`                |
    /// | `SCHEDULER_LOCK_OWNER`          | `scheduler-<uuid>`   |
    /// | `SCHEDULER_RETRY_BASE_DELAY_MS` | `30000`              |
    /// | `SCHEDULER_DRAIN_TIMEOUT_SECS`  | `30`                 |
    pub fn from_env() -> Self {
        let poll_interval_ms: u64 = std::env::var("SCHEDULER_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("SCHEDULER_POLL_INTERVAL_MS must be a valid u64");

        let batch_size: i64 = std::env::var("SCHEDULER_BATCH_SIZE")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("SCHEDULER_BATCH_SIZE must be a valid i64");

        let max_concurrent: usize = std::env::var("SCHEDULER_MAX_CONCURRENT")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("SCHEDULER_MAX_CONCURRENT must be a valid usize");

        let lock_stale_secs: i64 = std::env::var("SCHEDULER_LOCK_STALE_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("SCHEDULER_LOCK_STALE_SECS must be a valid i64");

        let lock_owner = std::env::var("SCHEDULER_LOCK_OWNER")
            .unwrap_or_else(|_| format!("scheduler-{}", Uuid::new_v4()));

        let retry_base_delay_ms: u64 = std::env::var("SCHEDULER_RETRY_BASE_DELAY_MS")
            .unwrap_or_else(|_| "30000".into())
            .parse()
            .expect("SCHEDULER_RETRY_BASE_DELAY_MS must be a valid u64");

        let drain_timeout_secs: u64 = std::env::var("SCHEDULER_DRAIN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SCHEDULER_DRAIN_TIMEOUT_SECS must be a valid u64");

        Self {
            poll_interval_ms,
            batch_size,
            max_concurrent,
            lock_stale_secs,
            lock_owner,
            retry_base_delay_ms,
            drain_timeout_secs,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            batch_size: 10,
            max_concurrent: 4,
            lock_stale_secs: 300,
            lock_owner: format!("scheduler-{}", Uuid::new_v4()),
            retry_base_delay_ms: 30_000,
            drain_timeout_secs: 30,
        }
    }
}
