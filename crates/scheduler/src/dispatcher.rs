//! Scheduler lifecycle and the poll loop.
//!
//! A single long-lived Tokio task polls for due jobs on a fixed
//! interval and hands them to the [`Executor`], keeping at most
//! `max_concurrent` attempts in flight. Starting requires the
//! scheduler lock, so one instance polls even when several share a
//! database; the rest keep serving their APIs.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use conveyor_core::clock::Clock;
use conveyor_core::retry::RetryPolicy;
use conveyor_core::types::DbId;
use conveyor_db::{JobStore, LockStore, StoreError};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::executor::Executor;
use crate::lock::LockManager;
use crate::registry::HandlerRegistry;
use crate::shutdown::ShutdownCoordinator;

/// Lifecycle state of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Stopped => "stopped",
            SchedulerState::Starting => "starting",
            SchedulerState::Running => "running",
            SchedulerState::Stopping => "stopping",
        }
    }
}

/// Ids of jobs currently executing.
///
/// Admission goes through this set, not a counter: a job that is
/// pending again mid-run (the store shows it due while its previous
/// attempt still executes) must not be admitted twice.
pub(crate) struct InFlight {
    jobs: Mutex<HashSet<DbId>>,
}

impl InFlight {
    fn new() -> Self {
        Self {
            jobs: Mutex::new(HashSet::new()),
        }
    }

    /// Admit `id` unless it is already executing.
    async fn try_admit(&self, id: DbId) -> bool {
        self.jobs.lock().await.insert(id)
    }

    async fn finish(&self, id: DbId) {
        self.jobs.lock().await.remove(&id);
    }

    async fn count(&self) -> usize {
        self.jobs.lock().await.len()
    }
}

struct RunState {
    cancel: Option<CancellationToken>,
    loop_handle: Option<JoinHandle<()>>,
}

/// The job scheduler: polls for due work and executes it.
pub struct Scheduler {
    store: Arc<dyn JobStore>,
    executor: Arc<Executor>,
    lock: LockManager,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    state: RwLock<SchedulerState>,
    in_flight: Arc<InFlight>,
    run: Mutex<RunState>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn JobStore>,
        lock_store: Arc<dyn LockStore>,
        registry: Arc<HandlerRegistry>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        let retry = RetryPolicy::new(Duration::from_millis(config.retry_base_delay_ms));
        let executor = Arc::new(Executor::new(
            Arc::clone(&store),
            registry,
            retry,
            Arc::clone(&clock),
        ));
        let lock = LockManager::new(
            lock_store,
            Arc::clone(&clock),
            config.lock_owner.clone(),
            config.lock_stale_secs,
        );

        Arc::new(Self {
            store,
            executor,
            lock,
            clock,
            config,
            state: RwLock::new(SchedulerState::Stopped),
            in_flight: Arc::new(InFlight::new()),
            run: Mutex::new(RunState {
                cancel: None,
                loop_handle: None,
            }),
        })
    }

    /// Start polling.
    ///
    /// Acquires the scheduler lock, runs one poll immediately so due
    /// work never waits a full interval, then spawns the loop. Fails
    /// with [`SchedulerError::LockUnavailable`] when another live
    /// instance polls already; callers may treat that as non-fatal.
    pub async fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        {
            let mut state = self.state.write().await;
            if *state != SchedulerState::Stopped {
                return Err(SchedulerError::AlreadyRunning);
            }
            *state = SchedulerState::Starting;
        }

        match self.try_start().await {
            Ok(()) => {
                *self.state.write().await = SchedulerState::Running;
                tracing::info!(
                    owner = %self.lock.owner(),
                    poll_interval_ms = self.config.poll_interval_ms,
                    batch_size = self.config.batch_size,
                    max_concurrent = self.config.max_concurrent,
                    "Scheduler started"
                );
                Ok(())
            }
            Err(e) => {
                *self.state.write().await = SchedulerState::Stopped;
                Err(e)
            }
        }
    }

    async fn try_start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        if !self.lock.acquire().await? {
            let owner = self
                .lock
                .holder()
                .await?
                .unwrap_or_else(|| "unknown".to_string());
            return Err(SchedulerError::LockUnavailable { owner });
        }

        if let Err(e) = self.tick().await {
            tracing::error!(error = %e, "Initial poll failed");
        }

        let cancel = CancellationToken::new();
        let loop_handle = tokio::spawn(Arc::clone(self).run_loop(cancel.clone()));

        let mut run = self.run.lock().await;
        run.cancel = Some(cancel);
        run.loop_handle = Some(loop_handle);
        Ok(())
    }

    /// Run the poll loop until the cancellation token is triggered.
    async fn run_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately and start() already polled.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scheduler poll loop stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Poll tick failed");
                    }
                }
            }
        }
    }

    /// One poll cycle: fetch due jobs and admit them up to the
    /// concurrency limit.
    ///
    /// Ticks never overlap; the loop awaits each cycle before the next,
    /// so admissions are sequential and the limit cannot be exceeded.
    async fn tick(&self) -> Result<(), StoreError> {
        let in_flight = self.in_flight.count().await;
        if in_flight >= self.config.max_concurrent {
            tracing::debug!(in_flight, "At concurrency limit, skipping poll");
            return Ok(());
        }

        let now = self.clock.now();
        let due = self.store.fetch_due(self.config.batch_size, now).await?;
        if due.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = due.len(), "Fetched due jobs");

        for job in due {
            if self.in_flight.count().await >= self.config.max_concurrent {
                tracing::debug!("Concurrency limit reached mid-batch");
                break;
            }
            // Still executing from an earlier tick.
            if !self.in_flight.try_admit(job.id).await {
                continue;
            }

            let executor = Arc::clone(&self.executor);
            let in_flight = Arc::clone(&self.in_flight);
            tokio::spawn(async move {
                let job_id = job.id;
                executor.run(job).await;
                in_flight.finish(job_id).await;
            });
        }

        Ok(())
    }

    /// Stop polling and release the scheduler lock.
    ///
    /// Does not wait for in-flight jobs; they run to completion on
    /// their own tasks. Use [`ShutdownCoordinator`] to drain.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        self.halt_ticks().await?;
        self.release_lock().await;
        *self.state.write().await = SchedulerState::Stopped;
        tracing::info!("Scheduler stopped");
        Ok(())
    }

    /// Cancel the poll loop and wait for it to exit.
    pub(crate) async fn halt_ticks(&self) -> Result<(), SchedulerError> {
        {
            let mut state = self.state.write().await;
            if *state != SchedulerState::Running {
                return Err(SchedulerError::NotRunning);
            }
            *state = SchedulerState::Stopping;
        }

        let (cancel, loop_handle) = {
            let mut run = self.run.lock().await;
            (run.cancel.take(), run.loop_handle.take())
        };
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(handle) = loop_handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Poll loop task failed");
            }
        }
        Ok(())
    }

    /// Release the scheduler lock, logging instead of failing.
    pub(crate) async fn release_lock(&self) {
        if let Err(e) = self.lock.release().await {
            tracing::error!(error = %e, "Failed to release scheduler lock");
        }
    }

    pub(crate) async fn set_stopped(&self) {
        *self.state.write().await = SchedulerState::Stopped;
    }

    /// Coordinator for draining this scheduler at process shutdown.
    pub fn shutdown_coordinator(self: &Arc<Self>) -> ShutdownCoordinator {
        ShutdownCoordinator::new(Arc::clone(self))
    }

    pub async fn state(&self) -> SchedulerState {
        *self.state.read().await
    }

    /// Number of jobs currently executing.
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.count().await
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}
