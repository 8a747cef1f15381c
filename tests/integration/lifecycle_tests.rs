//! Artifact lifecycle integration tests.
//!
//! Tests verify:
//! - Download quotas end in 403 until swept
//! - Expired images are 404
//! - Conversions sweep dead images from memory and disk
//! - Concurrent downloads never exceed the quota
//! - The background sweeper removes images without traffic

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;

use snaplink::Sweeper;

use super::test_utils::{
    body_json, files_on_disk, get, get_with_token, short_lived_config, MockRenderer, TestApp,
    TEST_TOKEN, TINY_PNG,
};

#[tokio::test]
async fn test_quota_and_expiry_scenario() {
    let app = TestApp::with_config(
        MockRenderer::new(),
        short_lived_config(2, Duration::from_secs(1)),
    )
    .await;

    let created = app.convert_html("<h1>Hello</h1>").await;
    assert_eq!(created["downloads_remaining"], 2);
    let image_id = created["image_id"].as_str().unwrap().to_string();
    let uri = format!("/download/{}", image_id);

    assert_eq!(app.send(get(&uri)).await.status(), StatusCode::OK);
    assert_eq!(app.send(get(&uri)).await.status(), StatusCode::OK);

    let response = app.send(get(&uri)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "downloads_exhausted");

    // Exhausted but not yet swept: still visible to status
    let response = app
        .send(get_with_token(&format!("/status/{}", image_id), TEST_TOKEN))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["downloads_remaining"], 0);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    // Past expiry as well, but the used-up quota still answers until swept
    assert_eq!(app.send(get(&uri)).await.status(), StatusCode::FORBIDDEN);

    // The next conversion sweeps the dead image
    let fresh = app.convert_html("<p>next</p>").await;
    assert_eq!(app.send(get(&uri)).await.status(), StatusCode::NOT_FOUND);
    assert!(app.store.get(&image_id).await.is_err());
    assert!(!app.store.path_for(&image_id).exists());
    assert_eq!(app.store.len().await, 1);
    assert_eq!(files_on_disk(&app.store), 1);
    assert!(app
        .store
        .path_for(fresh["image_id"].as_str().unwrap())
        .exists());
}

#[tokio::test]
async fn test_exhausted_image_is_swept_by_conversion() {
    let app = TestApp::with_config(
        MockRenderer::new(),
        short_lived_config(1, Duration::from_secs(3600)),
    )
    .await;

    let created = app.convert_html("<p>once</p>").await;
    let image_id = created["image_id"].as_str().unwrap().to_string();

    let uri = format!("/download/{}", image_id);
    assert_eq!(app.send(get(&uri)).await.status(), StatusCode::OK);
    assert_eq!(app.send(get(&uri)).await.status(), StatusCode::FORBIDDEN);

    app.convert_html("<p>trigger</p>").await;

    assert_eq!(app.send(get(&uri)).await.status(), StatusCode::NOT_FOUND);
    assert!(!app.store.path_for(&image_id).exists());
}

#[tokio::test]
async fn test_download_does_not_sweep_other_images() {
    let app = TestApp::new().await;

    let dead = app
        .store
        .create_at(
            TINY_PNG,
            5,
            Duration::from_secs(1),
            Utc::now() - chrono::Duration::minutes(5),
        )
        .await
        .unwrap();
    let live = app.convert_html("<p>live</p>").await;

    // The conversion above already swept; register another dead one after it
    let dead_after = app
        .store
        .create_at(
            TINY_PNG,
            5,
            Duration::from_secs(1),
            Utc::now() - chrono::Duration::minutes(5),
        )
        .await
        .unwrap();
    assert!(app.store.get(&dead.id).await.is_err());

    let uri = format!("/download/{}", live["image_id"].as_str().unwrap());
    assert_eq!(app.send(get(&uri)).await.status(), StatusCode::OK);

    assert!(app.store.get(&dead_after.id).await.is_ok());
    assert!(app.store.path_for(&dead_after.id).exists());
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let app = TestApp::new().await;
    let created = app.convert_html("<p>x</p>").await;
    let image_id = created["image_id"].as_str().unwrap();

    std::fs::remove_file(app.store.path_for(image_id)).unwrap();

    let response = app.send(get(&format!("/download/{}", image_id))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.store.get(image_id).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_downloads_respect_quota() {
    let app = TestApp::with_config(
        MockRenderer::new(),
        short_lived_config(3, Duration::from_secs(3600)),
    )
    .await;
    let created = app.convert_html("<p>race</p>").await;
    let uri = format!("/download/{}", created["image_id"].as_str().unwrap());

    let mut tasks = Vec::new();
    for _ in 0..12 {
        let router = app.router.clone();
        let uri = uri.clone();
        tasks.push(tokio::spawn(async move {
            use tower::ServiceExt;
            router.oneshot(get(&uri)).await.unwrap().status()
        }));
    }

    let mut ok = 0;
    let mut forbidden = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::FORBIDDEN => forbidden += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(ok, 3);
    assert_eq!(forbidden, 9);
}

#[tokio::test]
async fn test_background_sweeper_removes_dead_images() {
    let app = TestApp::new().await;

    let live = app.convert_html("<p>live</p>").await;
    let live_id = live["image_id"].as_str().unwrap().to_string();
    let expired = app
        .store
        .create_at(
            TINY_PNG,
            5,
            Duration::from_secs(1),
            Utc::now() - chrono::Duration::minutes(1),
        )
        .await
        .unwrap();

    let handle = Sweeper::spawn(Arc::clone(&app.store), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.shutdown().await;

    assert!(app.store.get(&expired.id).await.is_err());
    assert!(!app.store.path_for(&expired.id).exists());
    assert!(app.store.get(&live_id).await.is_ok());
}
