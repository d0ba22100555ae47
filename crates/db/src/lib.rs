//! Persistence layer: job rows, audit logs, and the scheduler lock.
//!
//! [`store::JobStore`] and [`store::LockStore`] are the seams the engine
//! runs against. [`postgres`] provides the production implementations;
//! [`memory`] provides clock-injected in-memory ones for tests and
//! embedded use.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::{MemoryJobStore, MemoryLockStore};
pub use postgres::{PgJobStore, PgLockStore};
pub use store::{JobStore, LockStore, PurgeCounts, StoreError};

/// Shared Postgres connection pool type.
pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
