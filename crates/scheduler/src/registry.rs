//! Handler registration and resolution.
//!
//! A [`JobHandler`] implements one job type. The host registers its
//! handlers at startup; the executor resolves them by the job's type
//! string when an attempt runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use conveyor_core::clock::Clock;
use conveyor_db::models::job::Job;
use conveyor_db::JobStore;

/// Shared services a handler can reach while running.
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn JobStore>,
    pub clock: Arc<dyn Clock>,
}

/// One job type's execution logic.
///
/// Handlers own their payload schema: decode `job.payload` with serde
/// and return an error for malformed input, which counts as a failed
/// attempt like any other.
///
/// Execution is at-least-once. A crash after the work but before the
/// completion record leaves the job pending, so a later attempt will
/// run the handler again; handlers should be idempotent.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Execute one attempt.
    ///
    /// `Ok(value)` completes the job with `value` as its result. `Err`,
    /// a panic, or running past the job's timeout all count as a failed
    /// attempt and go through retry scheduling.
    async fn run(&self, job: Job, ctx: JobContext) -> anyhow::Result<serde_json::Value>;
}

/// Maps job type strings to their handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `job_type`, replacing any previous entry.
    pub fn register(&mut self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        let job_type = job_type.into();
        if self
            .handlers
            .insert(job_type.clone(), handler)
            .is_some()
        {
            tracing::warn!(job_type = %job_type, "Replaced existing job handler");
        } else {
            tracing::debug!(job_type = %job_type, "Registered job handler");
        }
    }

    /// Look up the handler for `job_type`.
    pub fn resolve(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }

    /// Job types with a registered handler.
    pub fn registered_types(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
