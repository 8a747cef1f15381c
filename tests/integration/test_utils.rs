//! Test utilities for integration tests.
//!
//! Provides a mock renderer and a router wired to a temporary storage
//! directory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use snaplink::{create_router, ArtifactStore, RenderError, Renderer, RouterConfig};

pub const TEST_TOKEN: &str = "test-api-token";
pub const TEST_BASE_URL: &str = "https://img.example.com";

/// Smallest valid PNG: 1x1 transparent pixel.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

// =============================================================================
// Mock Renderer
// =============================================================================

/// Renderer returning fixed bytes, or failing, while counting calls.
#[derive(Clone)]
pub struct MockRenderer {
    output: Bytes,
    fail_with: Option<String>,
    calls: Arc<AtomicUsize>,
    last_url: Arc<Mutex<Option<String>>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            output: Bytes::from_static(TINY_PNG),
            fail_with: None,
            calls: Arc::new(AtomicUsize::new(0)),
            last_url: Arc::new(Mutex::new(None)),
        }
    }

    /// Every render fails with a non-zero engine exit and `stderr`.
    pub fn failing(stderr: impl Into<String>) -> Self {
        Self {
            fail_with: Some(stderr.into()),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<String> {
        self.last_url.lock().unwrap().clone()
    }

    fn respond(&self) -> Result<Bytes, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(stderr) => Err(RenderError::Failed {
                code: Some(1),
                stderr: stderr.clone(),
            }),
            None => Ok(self.output.clone()),
        }
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn render_html(&self, _html: &str) -> Result<Bytes, RenderError> {
        self.respond()
    }

    async fn render_url(&self, url: &Url) -> Result<Bytes, RenderError> {
        *self.last_url.lock().unwrap() = Some(url.to_string());
        self.respond()
    }
}

// =============================================================================
// Test Application
// =============================================================================

/// A router plus handles to its store and renderer.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<ArtifactStore>,
    pub renderer: MockRenderer,
    _dir: TempDir,
}

impl TestApp {
    /// App mounted at the root path with default policy.
    pub async fn new() -> Self {
        Self::with_config(MockRenderer::new(), default_config()).await
    }

    pub async fn with_renderer(renderer: MockRenderer) -> Self {
        Self::with_config(renderer, default_config()).await
    }

    pub async fn with_config(renderer: MockRenderer, config: RouterConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ArtifactStore::open(dir.path()).await.unwrap());
        let router = create_router(renderer.clone(), Arc::clone(&store), config);
        Self {
            router,
            store,
            renderer,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// POST /convert/html with a valid token, returning the parsed body.
    pub async fn convert_html(&self, html: &str) -> serde_json::Value {
        let response = self
            .send(post_json("/convert/html", serde_json::json!({ "html": html }), Some(TEST_TOKEN)))
            .await;
        assert_eq!(response.status(), 201);
        body_json(response).await
    }
}

pub fn default_config() -> RouterConfig {
    RouterConfig::new(TEST_TOKEN)
        .with_base_url(TEST_BASE_URL)
        .with_root_path("")
        .with_tracing(false)
}

pub fn short_lived_config(max_downloads: u32, ttl: Duration) -> RouterConfig {
    default_config().with_policy(max_downloads, ttl)
}

// =============================================================================
// Request / Response Helpers
// =============================================================================

pub fn post_json(uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

/// Path portion of an absolute image link, suitable for routing.
pub fn link_path(image_url: &str) -> String {
    image_url
        .strip_prefix(TEST_BASE_URL)
        .unwrap_or(image_url)
        .to_string()
}

/// Number of files in the store's directory.
pub fn files_on_disk(store: &ArtifactStore) -> usize {
    std::fs::read_dir(store.root()).unwrap().count()
}
