use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use conveyor_api::config::ServerConfig;
use conveyor_api::routes;
use conveyor_api::state::AppState;
use conveyor_core::clock::{Clock, SystemClock};
use conveyor_db::{JobStore, LockStore, MemoryJobStore, MemoryLockStore};
use conveyor_scheduler::{HandlerRegistry, Scheduler, SchedulerConfig};

/// Everything a test needs: the wired router plus direct handles to the
/// backing store and scheduler for seeding and assertions.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryJobStore>,
    pub scheduler: Arc<Scheduler>,
}

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

/// Build the full application router with all middleware layers on top
/// of the in-memory stores. The scheduler is wired but not started, so
/// tests control execution themselves.
///
/// This mirrors the router construction in `main.rs` so integration
/// tests exercise the same middleware stack (CORS, request ID, timeout,
/// tracing, panic recovery) that production uses.
pub fn build_test_app() -> TestApp {
    let config = test_config();

    let clock = Arc::new(SystemClock) as Arc<dyn Clock>;
    let store = Arc::new(MemoryJobStore::new(Arc::clone(&clock)));
    let lock_store = Arc::new(MemoryLockStore::new()) as Arc<dyn LockStore>;
    let scheduler = Scheduler::new(
        Arc::clone(&store) as Arc<dyn JobStore>,
        lock_store,
        Arc::new(HandlerRegistry::new()),
        clock,
        SchedulerConfig::default(),
    );

    let state = AppState {
        store: Arc::clone(&store) as Arc<dyn JobStore>,
        scheduler: Arc::clone(&scheduler),
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    TestApp {
        app,
        store,
        scheduler,
    }
}

/// Send a GET request to the app.
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Send a POST request with no body.
pub async fn post_empty(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
