use conveyor_db::StoreError;
use thiserror::Error;

/// Errors surfaced by the scheduler lifecycle and its collaborators.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Another live instance holds the scheduler lock. Non-fatal: the
    /// host can keep serving its API and try again later.
    #[error("Scheduler lock is already held by '{owner}'")]
    LockUnavailable { owner: String },

    /// `start` was called while the scheduler was not stopped.
    #[error("Scheduler is already running")]
    AlreadyRunning,

    /// `stop` was called while the scheduler was not running.
    #[error("Scheduler is not running")]
    NotRunning,

    #[error(transparent)]
    Store(#[from] StoreError),
}
