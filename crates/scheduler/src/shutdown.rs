//! Graceful shutdown with drain.
//!
//! Process shutdown wants more than [`Scheduler::stop`]: halt polling,
//! give in-flight jobs a bounded window to finish, and hand the lock
//! to a successor either way. Signal handling stays at the host entry
//! point; this type only coordinates the drain.

use std::sync::Arc;
use std::time::Duration;

use crate::dispatcher::Scheduler;
use crate::error::SchedulerError;

/// Poll cadence while waiting for in-flight jobs to finish.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Drains and stops a [`Scheduler`] at process shutdown.
pub struct ShutdownCoordinator {
    scheduler: Arc<Scheduler>,
}

impl ShutdownCoordinator {
    pub(crate) fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }

    /// Drain and stop the scheduler.
    ///
    /// Halts the poll loop, waits up to `timeout` for in-flight jobs
    /// to finish, then releases the scheduler lock whether or not the
    /// drain completed, so a successor can take over immediately.
    /// Returns `true` when every job finished inside the window.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        match self.scheduler.halt_ticks().await {
            Ok(()) => {}
            // Never started (e.g. the lock was held elsewhere): nothing
            // to halt, but the drain and release below still apply.
            Err(SchedulerError::NotRunning) => {
                tracing::debug!("Scheduler was not polling at shutdown");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to halt scheduler polling");
            }
        }

        let drained = self.wait_for_drain(timeout).await;
        if drained {
            tracing::info!("All in-flight jobs finished before shutdown");
        } else {
            tracing::warn!(
                remaining = self.scheduler.in_flight_count().await,
                timeout_ms = timeout.as_millis() as u64,
                "Shutdown window expired with jobs still in flight"
            );
        }

        self.scheduler.release_lock().await;
        self.scheduler.set_stopped().await;
        drained
    }

    async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.scheduler.in_flight_count().await == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use conveyor_core::clock::{Clock, SystemClock};
    use conveyor_db::{JobStore, LockStore, MemoryJobStore, MemoryLockStore};

    use super::*;
    use crate::config::SchedulerConfig;
    use crate::dispatcher::SchedulerState;
    use crate::registry::HandlerRegistry;

    #[tokio::test]
    async fn shutdown_of_idle_scheduler_is_clean() {
        let clock = Arc::new(SystemClock) as Arc<dyn Clock>;
        let store = Arc::new(MemoryJobStore::new(Arc::clone(&clock))) as Arc<dyn JobStore>;
        let lock_store = Arc::new(MemoryLockStore::new()) as Arc<dyn LockStore>;
        let scheduler = Scheduler::new(
            store,
            lock_store,
            Arc::new(HandlerRegistry::new()),
            clock,
            SchedulerConfig::default(),
        );
        scheduler.start().await.unwrap();

        let coordinator = scheduler.shutdown_coordinator();
        assert!(coordinator.shutdown(Duration::from_secs(1)).await);
        assert_eq!(scheduler.state().await, SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn shutdown_without_start_is_clean() {
        let clock = Arc::new(SystemClock) as Arc<dyn Clock>;
        let store = Arc::new(MemoryJobStore::new(Arc::clone(&clock))) as Arc<dyn JobStore>;
        let lock_store = Arc::new(MemoryLockStore::new()) as Arc<dyn LockStore>;
        let scheduler = Scheduler::new(
            store,
            lock_store,
            Arc::new(HandlerRegistry::new()),
            clock,
            SchedulerConfig::default(),
        );

        // Never started (as when the lock was held by a peer).
        let coordinator = scheduler.shutdown_coordinator();
        assert!(coordinator.shutdown(Duration::from_millis(50)).await);
        assert_eq!(scheduler.state().await, SchedulerState::Stopped);
    }
}
