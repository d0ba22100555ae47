//! Postgres implementation of [`LockStore`] over the `scheduler_locks`
//! table.
//!
//! Atomicity comes from the table's primary key and conditional writes:
//! `INSERT ... ON CONFLICT DO NOTHING` for fresh acquisition and a
//! timestamp-guarded UPDATE for stale takeover, each decided by
//! `rows_affected`.

use async_trait::async_trait;
use conveyor_core::types::Timestamp;

use crate::models::lock::LockRecord;
use crate::store::{LockStore, StoreError};
use crate::DbPool;

/// Postgres lock store.
#[derive(Debug, Clone)]
pub struct PgLockStore {
    pool: DbPool,
}

impl PgLockStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LockStore for PgLockStore {
    async fn find(&self, name: &str) -> Result<Option<LockRecord>, StoreError> {
        let record = sqlx::query_as::<_, LockRecord>(
            "SELECT name, owner, locked_at FROM scheduler_locks WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn try_insert(
        &self,
        name: &str,
        owner: &str,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let rows = sqlx::query(
            "INSERT INTO scheduler_locks (name, owner, locked_at) VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(owner)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn try_takeover(
        &self,
        name: &str,
        owner: &str,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<bool, StoreError> {
        let rows = sqlx::query(
            "UPDATE scheduler_locks SET owner = $2, locked_at = $3 \
             WHERE name = $1 AND locked_at < $4",
        )
        .bind(name)
        .bind(owner)
        .bind(now)
        .bind(stale_before)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn release(&self, name: &str, owner: &str) -> Result<bool, StoreError> {
        let rows = sqlx::query("DELETE FROM scheduler_locks WHERE name = $1 AND owner = $2")
            .bind(name)
            .bind(owner)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }
}
