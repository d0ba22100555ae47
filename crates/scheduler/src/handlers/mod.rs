//! Built-in job handlers.

pub mod cleanup;

pub use cleanup::{CleanupHandler, CLEANUP_JOB_TYPE};
