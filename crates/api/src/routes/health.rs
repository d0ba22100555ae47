use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Payload for `GET /health`.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when the store answers, `degraded` otherwise.
    pub status: &'static str,
    /// Version of the running binary.
    pub version: &'static str,
    /// Result of the store ping.
    pub db_healthy: bool,
    /// Lifecycle state of this instance's scheduler (`running` while it
    /// holds the poll lock, `stopped` when another instance does).
    pub scheduler: &'static str,
}

/// Liveness probe. Answers 200 even when the store is down, with
/// `status` flipped to `degraded`, so a prober can tell "unhealthy"
/// from "gone".
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_ok = state.store.ping().await.is_ok();

    Json(HealthResponse {
        status: if store_ok { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy: store_ok,
        scheduler: state.scheduler.state().await.as_str(),
    })
}

/// Mounted at the root, deliberately outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
