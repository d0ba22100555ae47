use std::sync::Arc;
use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conveyor_api::config::ServerConfig;
use conveyor_api::{routes, state};
use conveyor_core::clock::{Clock, SystemClock};
use conveyor_db::{JobStore, LockStore, PgJobStore, PgLockStore};
use conveyor_scheduler::handlers::{CleanupHandler, CLEANUP_JOB_TYPE};
use conveyor_scheduler::{HandlerRegistry, Scheduler, SchedulerConfig, SchedulerError};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "conveyor_api=debug,conveyor_scheduler=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let scheduler_config = SchedulerConfig::from_env();
    tracing::info!(addr = %config.bind_addr(), "Configuration loaded");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = conveyor_db::create_pool(&database_url)
        .await
        .expect("Could not connect to Postgres");
    conveyor_db::health_check(&pool)
        .await
        .expect("Postgres did not answer the startup health check");
    conveyor_db::run_migrations(&pool)
        .await
        .expect("Migrations failed");
    tracing::info!("Database ready, migrations up to date");

    let mut registry = HandlerRegistry::new();
    registry.register(CLEANUP_JOB_TYPE, Arc::new(CleanupHandler));
    tracing::info!(handlers = registry.len(), "Job handlers registered");

    let clock = Arc::new(SystemClock) as Arc<dyn Clock>;
    let store = Arc::new(PgJobStore::new(pool.clone())) as Arc<dyn JobStore>;
    let lock_store = Arc::new(PgLockStore::new(pool.clone())) as Arc<dyn LockStore>;

    let scheduler = Scheduler::new(
        Arc::clone(&store),
        lock_store,
        Arc::new(registry),
        clock,
        scheduler_config,
    );

    match scheduler.start().await {
        Ok(()) => {}
        // Another instance polls; this one stays up for the API alone.
        Err(SchedulerError::LockUnavailable { owner }) => {
            tracing::warn!(%owner, "Scheduler lock held by another instance, serving API only");
        }
        Err(e) => panic!("Scheduler failed to start: {e}"),
    }

    let app_state = AppState {
        store,
        scheduler: Arc::clone(&scheduler),
        config: Arc::new(config.clone()),
    };

    let request_id_header = HeaderName::from_static("x-request-id");

    // Layer order matters: axum applies these bottom-up, so the last
    // layer listed sees the request first.
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors_layer(&config.cors_origins))
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .expect("Could not bind listener");
    tracing::info!(addr = %config.bind_addr(), "Accepting connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server error");

    // The listener is closed at this point; drain the scheduler before
    // the process exits so running jobs are not killed mid-flight.
    tracing::info!("Listener closed, draining scheduler");

    let drain_timeout = Duration::from_secs(scheduler.config().drain_timeout_secs);
    let coordinator = scheduler.shutdown_coordinator();
    if coordinator.shutdown(drain_timeout).await {
        tracing::info!("Graceful shutdown complete");
    } else {
        tracing::warn!("Shutdown finished with jobs still in flight");
    }
}

/// Resolve when the process is told to stop.
///
/// Listens for SIGINT (Ctrl-C) and, on Unix, SIGTERM, so shutdown works
/// the same under a terminal, systemd, or a container runtime. Signal
/// handling stays here at the process entry point; the scheduler itself
/// only exposes plain async lifecycle methods.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Could not install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Could not install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// CORS layer for the configured origins.
///
/// A bad origin is a deployment mistake, so this panics at startup
/// rather than silently serving a half-working policy.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Bad CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}
