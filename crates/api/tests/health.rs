//! Endpoint-independent HTTP behaviour: health, 404s, request ids, CORS.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_store_and_scheduler() {
    let test_app = common::build_test_app();
    let response = get(test_app.app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["db_healthy"], true);
    // No scheduler was started for this app instance.
    assert_eq!(json["scheduler"], "stopped");
}

#[tokio::test]
async fn health_tracks_scheduler_lifecycle() {
    let test_app = common::build_test_app();
    test_app.scheduler.start().await.unwrap();

    let response = get(test_app.app.clone(), "/health").await;
    let json = body_json(response).await;
    assert_eq!(json["scheduler"], "running");

    test_app.scheduler.stop().await.unwrap();

    let response = get(test_app.app, "/health").await;
    let json = body_json(response).await;
    assert_eq!(json["scheduler"], "stopped");
}

// ---------------------------------------------------------------------------
// Router-level behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_routes_return_404() {
    let test_app = common::build_test_app();
    let response = get(test_app.app, "/no-such-route").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let test_app = common::build_test_app();
    let response = get(test_app.app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("x-request-id header missing")
        .to_str()
        .unwrap();
    // MakeRequestUuid produces hyphenated UUIDs.
    assert_eq!(request_id.len(), 36);
}

#[tokio::test]
async fn cors_preflight_allows_the_configured_origin() {
    let test_app = common::build_test_app();

    // Preflights need the Access-Control-Request-* headers, so bypass
    // the plain `get` helper.
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/jobs")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = test_app.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    let allow_origin = headers
        .get("access-control-allow-origin")
        .expect("allow-origin header missing")
        .to_str()
        .unwrap();
    assert_eq!(allow_origin, "http://localhost:5173");

    let allow_methods = headers
        .get("access-control-allow-methods")
        .expect("allow-methods header missing")
        .to_str()
        .unwrap();
    assert!(allow_methods.contains("POST"), "got: {allow_methods}");
}
