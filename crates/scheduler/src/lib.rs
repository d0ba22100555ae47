//! Background job execution engine.
//!
//! Polls the job store for due work and runs it through registered
//! handlers with per-job timeouts, exponential-backoff retries, and an
//! append-only audit trail:
//!
//! - [`Scheduler`] — poll loop with a concurrency cap, guarded by an
//!   advisory instance lock.
//! - [`Executor`] — one attempt end to end: claim, race the handler
//!   against the job's timeout, record the outcome.
//! - [`HandlerRegistry`] / [`JobHandler`] — job type dispatch.
//! - [`LockManager`] — single-poller guarantee with stale-lock seizure.
//! - [`ShutdownCoordinator`] — bounded drain at process shutdown.
//!
//! Execution is at-least-once; handlers are expected to be idempotent.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod lock;
pub mod registry;
pub mod shutdown;

pub use config::SchedulerConfig;
pub use dispatcher::{Scheduler, SchedulerState};
pub use error::SchedulerError;
pub use executor::{ExecutionOutcome, Executor};
pub use lock::{LockManager, SCHEDULER_LOCK_NAME};
pub use registry::{HandlerRegistry, JobContext, JobHandler};
pub use shutdown::ShutdownCoordinator;
