//! Integration tests for route wiring and request validation.
//!
//! Every test here exercises a path that fails (or completes) before any
//! database query runs, so no live services are needed: routing itself,
//! extractor rejections, handler-level validation, and the middleware
//! stack.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{body_json, build_test_app, get, post_json};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = build_test_app().await;
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = build_test_app().await;
    let response = get(app, "/this-route-does-not-exist").await;

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );

    // The value should be a valid UUID (36 chars with hyphens).
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36, "x-request-id should be a UUID string");
}

// ---------------------------------------------------------------------------
// Test: CORS preflight OPTIONS request returns the allowed origin
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_returns_allowed_origin() {
    let app = build_test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/v1/projects")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173")
    );
}

// ---------------------------------------------------------------------------
// Test: Listing projects without owner_id is rejected with 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listing_projects_requires_owner_id() {
    let app = build_test_app().await;
    let response = get(app, "/api/v1/projects").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "owner_id query parameter is required");
}

// ---------------------------------------------------------------------------
// Test: Listing generations without an address is rejected with 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listing_generations_requires_address() {
    let app = build_test_app().await;
    let response = get(app, "/api/v1/projects/1/generations").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Test: Upload notification with a blank filename is rejected with 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blank_filename_upload_returns_400() {
    let app = build_test_app().await;
    let response = post_json(
        app,
        "/api/v1/uploads/remote",
        serde_json::json!({ "filename": "   " }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "filename must not be empty");
}

// ---------------------------------------------------------------------------
// Test: The legacy save-node path is routed to the same handler
// ---------------------------------------------------------------------------

#[tokio::test]
async fn legacy_upload_alias_is_routed() {
    let app = build_test_app().await;
    let response = post_json(
        app,
        "/api/v1/media/remote-upload",
        serde_json::json!({ "filename": "" }),
    )
    .await;

    // Same validation failure as the canonical path; a missing route
    // would have produced a 404 instead.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Test: Upload notification without a filename is rejected by the extractor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_without_filename_is_rejected() {
    let app = build_test_app().await;
    let response = post_json(app, "/api/v1/uploads/remote", serde_json::json!({})).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ---------------------------------------------------------------------------
// Test: The WebSocket route rejects plain GET requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ws_route_rejects_non_upgrade_requests() {
    let app = build_test_app().await;
    let response = get(app, "/api/v1/ws").await;

    // Wired but not upgradable without the handshake headers.
    assert_ne!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.status().is_client_error());
}
