//! Postgres-backed store implementations.

pub mod job_store;
pub mod lock_store;

pub use job_store::PgJobStore;
pub use lock_store::PgLockStore;
