use std::sync::Arc;

use conveyor_db::JobStore;
use conveyor_scheduler::Scheduler;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Job store backing every handler.
    pub store: Arc<dyn JobStore>,
    /// Scheduler handle, for lifecycle state and the in-flight count.
    pub scheduler: Arc<Scheduler>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
