//! Authentication integration tests.
//!
//! Tests verify:
//! - Valid bearer tokens are accepted
//! - Missing, malformed and wrong tokens are rejected with 401
//! - Rejected requests never render or sweep
//! - Public routes stay open

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;

use super::test_utils::{
    body_json, get, get_with_token, post_json, TestApp, TEST_TOKEN, TINY_PNG,
};

// =============================================================================
// Accepted
// =============================================================================

#[tokio::test]
async fn test_valid_token_succeeds() {
    let app = TestApp::new().await;

    let response = app
        .send(post_json(
            "/convert/html",
            serde_json::json!({ "html": "<p>ok</p>" }),
            Some(TEST_TOKEN),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_lowercase_scheme_is_accepted() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/status/whatever")
        .header(header::AUTHORIZATION, format!("bearer {}", TEST_TOKEN))
        .body(Body::empty())
        .unwrap();

    // Past auth, so the lookup itself answers
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Rejected
// =============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .send(post_json(
            "/convert/html",
            serde_json::json!({ "html": "<p>x</p>" }),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );

    let body = body_json(response).await;
    assert_eq!(body["error"], "missing_credentials");
    assert_eq!(body["status"], 401);

    assert_eq!(app.renderer.calls(), 0);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_wrong_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .send(post_json(
            "/convert/url",
            serde_json::json!({ "url": "https://example.com" }),
            Some("not-the-token"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_token");
    assert_eq!(app.renderer.calls(), 0);
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/status/abc")
        .header(header::AUTHORIZATION, format!("Basic {}", TEST_TOKEN))
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_requires_token() {
    let app = TestApp::new().await;
    let created = app.convert_html("<p>x</p>").await;
    let uri = format!("/status/{}", created["image_id"].as_str().unwrap());

    let response = app.send(get(&uri)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(get_with_token(&uri, "wrong")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(get_with_token(&uri, TEST_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_body_without_token_is_unauthorized() {
    let app = TestApp::new().await;

    // Auth runs before the body is parsed
    let request = Request::builder()
        .method("POST")
        .uri("/convert/html")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unauthorized_conversion_does_not_sweep() {
    let app = TestApp::new().await;

    let expired = app
        .store
        .create_at(
            TINY_PNG,
            5,
            Duration::from_secs(60),
            Utc::now() - chrono::Duration::hours(1),
        )
        .await
        .unwrap();

    let response = app
        .send(post_json(
            "/convert/html",
            serde_json::json!({ "html": "<p>x</p>" }),
            Some("wrong"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Still registered: a rejected request performs no work
    assert!(app.store.get(&expired.id).await.is_ok());
    assert!(app.store.path_for(&expired.id).exists());
}

// =============================================================================
// Public Routes
// =============================================================================

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let app = TestApp::new().await;

    for uri in ["/", "/health"] {
        let response = app.send(get(uri)).await;
        assert_eq!(response.status(), StatusCode::OK, "uri {}", uri);
    }
}

#[tokio::test]
async fn test_unknown_route_is_not_unauthorized() {
    let app = TestApp::new().await;

    let response = app.send(get("/convert/nothing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
