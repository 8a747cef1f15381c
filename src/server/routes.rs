//! Router configuration for Snaplink.
//!
//! This module defines the HTTP routes and applies middleware for bearer
//! authentication, CORS and request tracing.
//!
//! # Route Structure
//!
//! All paths are mounted under the configured root path (e.g. `/html_to_image`).
//!
//! ```text
//! /                        - Liveness probe (public)
//! /health                  - Health check (public)
//! /convert/html            - Render HTML (protected)
//! /convert/url             - Render a URL (protected)
//! /download/{image_id}     - Download an image (public, capability by ID)
//! /status/{image_id}       - Inspect an image (protected)
//! /openapi.json            - OpenAPI document (public)
//! /docs                    - Swagger UI (public)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use snaplink::render::WkHtmlToImage;
//! use snaplink::server::routes::{create_router, RouterConfig};
//! use snaplink::store::ArtifactStore;
//!
//! let store = Arc::new(ArtifactStore::open("static").await?);
//! let config = RouterConfig::new("my-token")
//!     .with_base_url("https://img.example.com")
//!     .with_root_path("/html_to_image");
//!
//! let router = create_router(WkHtmlToImage::default(), store, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

use super::auth::{bearer_auth_middleware, BearerAuth};
use super::handlers::{
    convert_html_handler, convert_url_handler, download_handler, health_handler, root_handler,
    status_handler, AppState,
};
use super::links::{normalize_root_path, LinkBuilder};
use super::openapi::api_doc;
use crate::config::{
    DEFAULT_BASE_URL, DEFAULT_IMAGE_EXPIRY_DAYS, DEFAULT_MAX_DOWNLOADS, DEFAULT_ROOT_PATH,
};
use crate::render::Renderer;
use crate::store::ArtifactStore;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Bearer token for protected endpoints
    pub api_token: String,

    /// Base for absolute image links
    pub base_url: String,

    /// Prefix all routes are mounted under
    pub root_path: String,

    /// Default download disposition (true = inline)
    pub host_images: bool,

    /// Download quota for new images
    pub max_downloads: u32,

    /// Lifetime of new images
    pub ttl: Duration,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given API token.
    ///
    /// By default:
    /// - Links use `http://localhost:8000` and the `/html_to_image` prefix
    /// - Images are served inline
    /// - 5 downloads per image, 3 day lifetime
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            root_path: DEFAULT_ROOT_PATH.to_string(),
            host_images: true,
            max_downloads: DEFAULT_MAX_DOWNLOADS,
            ttl: Duration::from_secs(u64::from(DEFAULT_IMAGE_EXPIRY_DAYS) * 86400),
            cors_origins: None,
            enable_tracing: true,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the route prefix. "" or "/" mounts at the root.
    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }

    pub fn with_host_images(mut self, host_images: bool) -> Self {
        self.host_images = host_images;
        self
    }

    /// Set the quota and lifetime for new images.
    pub fn with_policy(mut self, max_downloads: u32, ttl: Duration) -> Self {
        self.max_downloads = max_downloads;
        self.ttl = ttl;
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Public routes (probes, downloads)
/// - Protected routes (conversion, status) behind the bearer token
/// - The root path prefix
/// - OpenAPI JSON and Swagger UI under the same prefix
/// - CORS configuration
/// - Request tracing (optional)
///
/// Authentication is a route layer, so unknown paths are 404 rather than 401.
pub fn create_router<R>(renderer: R, store: Arc<ArtifactStore>, config: RouterConfig) -> Router
where
    R: Renderer + 'static,
{
    let links = LinkBuilder::new(&config.base_url, &config.root_path);
    let app_state = AppState::new(renderer, store, links)
        .with_policy(config.max_downloads, config.ttl)
        .with_host_images(config.host_images);

    let auth = BearerAuth::new(&config.api_token);
    let cors = build_cors_layer(&config);

    let protected_routes = Router::new()
        .route("/convert/html", post(convert_html_handler::<R>))
        .route("/convert/url", post(convert_url_handler::<R>))
        .route("/status/{image_id}", get(status_handler::<R>))
        .route_layer(middleware::from_fn_with_state(auth, bearer_auth_middleware));

    let public_routes = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/download/{image_id}", get(download_handler::<R>));

    let app = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .with_state(app_state);

    let root_path = normalize_root_path(&config.root_path);
    let router = if root_path.is_empty() {
        app
    } else {
        Router::new().nest(&root_path, app)
    };

    let router = router
        .merge(
            SwaggerUi::new(format!("{}/docs", root_path))
                .url(format!("{}/openapi.json", root_path), api_doc(&root_path)),
        )
        .layer(cors);

    // Add tracing if enabled
    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
