//! Advisory scheduler lock.
//!
//! Exactly one live scheduler instance polls for jobs at a time. The
//! lock is a named row claimed atomically through [`LockStore`]; a row
//! older than the staleness window is treated as abandoned by a crashed
//! instance and seized.

use std::sync::Arc;

use chrono::Duration;
use conveyor_core::clock::Clock;
use conveyor_db::{LockStore, StoreError};

/// Name of the row guarding the poll loop.
pub const SCHEDULER_LOCK_NAME: &str = "scheduler";

/// Claims and releases the scheduler lock on behalf of one instance.
pub struct LockManager {
    store: Arc<dyn LockStore>,
    clock: Arc<dyn Clock>,
    owner: String,
    stale_after: Duration,
}

impl LockManager {
    pub fn new(
        store: Arc<dyn LockStore>,
        clock: Arc<dyn Clock>,
        owner: String,
        stale_secs: i64,
    ) -> Self {
        Self {
            store,
            clock,
            owner,
            stale_after: Duration::seconds(stale_secs),
        }
    }

    /// The identity this instance locks under.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The current holder of the lock, if any.
    pub async fn holder(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .find(SCHEDULER_LOCK_NAME)
            .await?
            .map(|record| record.owner))
    }

    /// Try to claim the lock.
    ///
    /// Returns `Ok(false)` when another live instance holds it. A lock
    /// whose timestamp has fallen behind the staleness window is
    /// presumed abandoned and taken over with a warning.
    pub async fn acquire(&self) -> Result<bool, StoreError> {
        let now = self.clock.now();

        if self
            .store
            .try_insert(SCHEDULER_LOCK_NAME, &self.owner, now)
            .await?
        {
            tracing::info!(owner = %self.owner, "Acquired scheduler lock");
            return Ok(true);
        }

        let stale_before = now - self.stale_after;
        match self.store.find(SCHEDULER_LOCK_NAME).await? {
            Some(record) if record.locked_at < stale_before => {
                if self
                    .store
                    .try_takeover(SCHEDULER_LOCK_NAME, &self.owner, now, stale_before)
                    .await?
                {
                    tracing::warn!(
                        owner = %self.owner,
                        previous_owner = %record.owner,
                        locked_at = %record.locked_at,
                        "Seized stale scheduler lock"
                    );
                    Ok(true)
                } else {
                    // Another instance won the takeover race.
                    tracing::debug!("Lost race for stale scheduler lock");
                    Ok(false)
                }
            }
            Some(record) => {
                tracing::debug!(owner = %record.owner, "Scheduler lock held by live instance");
                Ok(false)
            }
            // Holder released between our insert and find attempts.
            None => {
                self.store
                    .try_insert(SCHEDULER_LOCK_NAME, &self.owner, now)
                    .await
            }
        }
    }

    /// Release the lock if this instance still owns it.
    ///
    /// Releasing a lock that was already seized or released is a no-op.
    pub async fn release(&self) -> Result<(), StoreError> {
        if self
            .store
            .release(SCHEDULER_LOCK_NAME, &self.owner)
            .await?
        {
            tracing::info!(owner = %self.owner, "Released scheduler lock");
        } else {
            tracing::warn!(
                owner = %self.owner,
                "Scheduler lock was no longer held by this instance"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use conveyor_core::clock::ManualClock;
    use conveyor_db::MemoryLockStore;

    use super::*;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn manager(
        store: &Arc<MemoryLockStore>,
        clock: &Arc<ManualClock>,
        owner: &str,
    ) -> LockManager {
        LockManager::new(
            Arc::clone(store) as Arc<dyn LockStore>,
            Arc::clone(clock) as Arc<dyn Clock>,
            owner.to_string(),
            300,
        )
    }

    #[tokio::test]
    async fn acquire_succeeds_when_free() {
        let store = Arc::new(MemoryLockStore::new());
        let clock = clock();
        let lock = manager(&store, &clock, "a");

        assert!(lock.acquire().await.unwrap());
        assert_eq!(lock.holder().await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn fresh_lock_blocks_other_instances() {
        let store = Arc::new(MemoryLockStore::new());
        let clock = clock();
        let first = manager(&store, &clock, "a");
        let second = manager(&store, &clock, "b");

        assert!(first.acquire().await.unwrap());
        assert!(!second.acquire().await.unwrap());
        assert_eq!(first.holder().await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn concurrent_acquires_have_exactly_one_winner() {
        let store = Arc::new(MemoryLockStore::new());
        let clock = clock();
        let first = manager(&store, &clock, "a");
        let second = manager(&store, &clock, "b");

        let (a, b) = tokio::join!(first.acquire(), second.acquire());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a ^ b, "exactly one concurrent acquire must win");
    }

    #[tokio::test]
    async fn acquire_after_release() {
        let store = Arc::new(MemoryLockStore::new());
        let clock = clock();
        let first = manager(&store, &clock, "a");
        let second = manager(&store, &clock, "b");

        assert!(first.acquire().await.unwrap());
        first.release().await.unwrap();
        assert!(second.acquire().await.unwrap());
    }

    #[tokio::test]
    async fn stale_lock_is_seized() {
        let store = Arc::new(MemoryLockStore::new());
        let clock = clock();
        let crashed = manager(&store, &clock, "crashed");
        assert!(crashed.acquire().await.unwrap());

        // Crashed holder never refreshes; six minutes later the record
        // has aged out of the staleness window.
        clock.advance(Duration::minutes(6));
        let successor = manager(&store, &clock, "successor");
        assert!(successor.acquire().await.unwrap());
        assert_eq!(
            successor.holder().await.unwrap().as_deref(),
            Some("successor")
        );
    }

    #[tokio::test]
    async fn lock_at_staleness_boundary_is_not_seized() {
        let store = Arc::new(MemoryLockStore::new());
        let clock = clock();
        let holder = manager(&store, &clock, "holder");
        assert!(holder.acquire().await.unwrap());

        // Exactly five minutes old: still considered live.
        clock.advance(Duration::minutes(5));
        let contender = manager(&store, &clock, "contender");
        assert!(!contender.acquire().await.unwrap());

        // One second past the window: abandoned.
        clock.advance(Duration::seconds(1));
        assert!(contender.acquire().await.unwrap());
    }

    #[tokio::test]
    async fn release_without_holding_is_a_noop() {
        let store = Arc::new(MemoryLockStore::new());
        let clock = clock();
        let first = manager(&store, &clock, "a");
        let second = manager(&store, &clock, "b");

        assert!(first.acquire().await.unwrap());
        // Not the holder; the lock must survive.
        second.release().await.unwrap();
        assert_eq!(first.holder().await.unwrap().as_deref(), Some("a"));
    }
}
