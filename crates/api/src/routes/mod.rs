pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Everything mounted under `/api/v1`.
///
/// `/health` is not here: it stays at the root so probes keep working
/// across API version bumps (see [`health::router`]).
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/jobs", jobs::router())
}
