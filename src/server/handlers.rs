//! HTTP request handlers for the Snaplink API.
//!
//! # Endpoints
//!
//! - `POST /convert/html` - Render posted HTML (bearer token)
//! - `POST /convert/url` - Render a web page (bearer token)
//! - `GET /download/{image_id}` - Fetch an image, spending one download
//! - `GET /status/{image_id}` - Inspect an image without spending (bearer token)
//! - `GET /` - Liveness probe
//! - `GET /health` - Health check with version
//!
//! The OpenAPI document for these endpoints is [`super::openapi::ApiDoc`].

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::config::{DEFAULT_IMAGE_EXPIRY_DAYS, DEFAULT_MAX_DOWNLOADS};
use crate::error::{RenderError, StoreError};
use crate::render::{parse_http_url, Renderer};
use crate::store::{ArtifactMetadata, ArtifactStore};

use super::extract::{ApiJson, ApiQuery};
use super::links::LinkBuilder;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to handlers via Axum's State extractor.
pub struct AppState<R: Renderer> {
    /// Rendering engine adapter
    pub renderer: Arc<R>,

    /// Artifact registry
    pub store: Arc<ArtifactStore>,

    /// Absolute link construction
    pub links: LinkBuilder,

    /// Download quota given to new images
    pub max_downloads: u32,

    /// Lifetime given to new images
    pub ttl: Duration,

    /// Disposition used when a download does not pass `host_images`
    pub host_images: bool,
}

impl<R: Renderer> AppState<R> {
    /// Create state with default quota (5), TTL (3 days) and inline disposition.
    pub fn new(renderer: R, store: Arc<ArtifactStore>, links: LinkBuilder) -> Self {
        Self {
            renderer: Arc::new(renderer),
            store,
            links,
            max_downloads: DEFAULT_MAX_DOWNLOADS,
            ttl: Duration::from_secs(u64::from(DEFAULT_IMAGE_EXPIRY_DAYS) * 86400),
            host_images: true,
        }
    }

    /// Set the quota and lifetime for new images.
    pub fn with_policy(mut self, max_downloads: u32, ttl: Duration) -> Self {
        self.max_downloads = max_downloads;
        self.ttl = ttl;
        self
    }

    /// Set the default download disposition.
    pub fn with_host_images(mut self, host_images: bool) -> Self {
        self.host_images = host_images;
        self
    }
}

impl<R: Renderer> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            store: Arc::clone(&self.store),
            links: self.links.clone(),
            max_downloads: self.max_downloads,
            ttl: self.ttl,
            host_images: self.host_images,
        }
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /convert/html`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct HtmlRequest {
    /// Complete HTML document or fragment
    #[schema(example = "<h1>Hello</h1>")]
    pub html: String,
}

/// Body of `POST /convert/url`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UrlRequest {
    /// Absolute http(s) URL of the page to render
    #[schema(example = "https://example.com")]
    pub url: String,
}

/// Query parameters for downloads.
#[derive(Debug, Deserialize)]
pub struct DownloadQueryParams {
    /// 1 serves inline, anything else as attachment; absent uses the server default
    #[serde(default)]
    pub host_images: Option<i64>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "render_failed")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Descriptor returned after a successful conversion.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageResponse {
    pub image_url: String,
    pub image_id: String,
    pub downloads_remaining: u32,
    pub expires_at: DateTime<Utc>,
}

/// Metadata snapshot returned by the status endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub image_id: String,
    pub image_url: String,
    pub downloads_remaining: u32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StatusResponse {
    fn from_metadata(metadata: ArtifactMetadata, image_url: String) -> Self {
        Self {
            image_id: metadata.id,
            image_url,
            downloads_remaining: metadata.downloads_remaining,
            expires_at: metadata.expires_at,
            created_at: metadata.created_at,
        }
    }
}

/// Liveness probe response.
#[derive(Debug, Serialize, ToSchema)]
pub struct RootResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "HTML to Image API")]
    pub service: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert StoreError to HTTP response.
///
/// Unknown, vanished and expired images are indistinguishable to clients (404);
/// an exhausted image that has not been swept yet is 403.
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            StoreError::NotFound(_) | StoreError::Expired(_) => (
                StatusCode::NOT_FOUND,
                "not_found",
                "Image not found or expired".to_string(),
            ),
            StoreError::Exhausted(_) => (
                StatusCode::FORBIDDEN,
                "downloads_exhausted",
                "Maximum number of downloads reached".to_string(),
            ),
            StoreError::InvalidPolicy(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "invalid_policy",
                format!("Invalid artifact policy: {}", msg),
            ),
            StoreError::Io(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                format!("Storage error: {}", msg),
            ),
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Image not found: {}",
                self
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                self
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

/// Errors from the conversion endpoints.
#[derive(Debug)]
pub enum ConvertError {
    /// Posted URL is not an absolute http(s) URL
    InvalidUrl(String),

    /// Rendering posted HTML failed; the cause is logged, not returned
    HtmlRender(RenderError),

    /// Rendering a URL failed; the cause is returned to the client
    UrlRender(RenderError),

    /// Registering the rendered image failed
    Store(StoreError),
}

impl From<StoreError> for ConvertError {
    fn from(err: StoreError) -> Self {
        ConvertError::Store(err)
    }
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ConvertError::Store(err) => return err.into_response(),

            ConvertError::InvalidUrl(reason) => {
                warn!(
                    error_type = "invalid_url",
                    status = StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
                    "Client error: {}",
                    reason
                );
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_url",
                    format!("Invalid URL: {}", reason),
                )
            }

            ConvertError::HtmlRender(err) => {
                error!(error_type = "render_failed", "Error converting HTML to image: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "render_failed",
                    "Failed to convert HTML to image".to_string(),
                )
            }

            ConvertError::UrlRender(err) => {
                error!(error_type = "render_failed", "Error converting URL to image: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "render_failed",
                    format!("Failed to convert URL to image: {}", err),
                )
            }
        };

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle HTML conversion requests.
///
/// # Endpoint
///
/// `POST /convert/html` with `{ "html": "<h1>Hello</h1>" }`
///
/// # Response
///
/// - `201 Created`: [`ImageResponse`]; `image_url` has no query string
/// - `401 Unauthorized`: Missing or wrong bearer token (from middleware)
/// - `500 Internal Server Error`: Rendering failed; nothing is stored
#[utoipa::path(
    post,
    path = "/convert/html",
    tag = "Conversion",
    summary = "Render HTML to PNG",
    request_body = HtmlRequest,
    security(("bearer_token" = [])),
    responses(
        (status = 201, description = "Image stored", body = ImageResponse),
        (status = 401, description = "Missing or wrong bearer token", body = ErrorResponse),
        (status = 422, description = "Body is not a valid request", body = ErrorResponse),
        (status = 500, description = "Rendering failed", body = ErrorResponse)
    )
)]
pub async fn convert_html_handler<R: Renderer>(
    State(state): State<AppState<R>>,
    ApiJson(request): ApiJson<HtmlRequest>,
) -> Result<(StatusCode, Json<ImageResponse>), ConvertError> {
    state.store.sweep(Utc::now()).await;

    let png = state
        .renderer
        .render_html(&request.html)
        .await
        .map_err(ConvertError::HtmlRender)?;

    let metadata = state
        .store
        .create(&png, state.max_downloads, state.ttl)
        .await?;

    let image_url = state.links.download(&metadata.id, None);
    Ok((StatusCode::CREATED, Json(image_response(metadata, image_url))))
}

/// Handle URL conversion requests.
///
/// # Endpoint
///
/// `POST /convert/url` with `{ "url": "https://example.com" }`
///
/// # Response
///
/// - `201 Created`: [`ImageResponse`]; `image_url` carries `?host_images=0|1`
/// - `401 Unauthorized`: Missing or wrong bearer token (from middleware)
/// - `422 Unprocessable Entity`: Not an absolute http(s) URL
/// - `500 Internal Server Error`: Rendering failed, with the engine's reason
#[utoipa::path(
    post,
    path = "/convert/url",
    tag = "Conversion",
    summary = "Render a web page to PNG",
    request_body = UrlRequest,
    security(("bearer_token" = [])),
    responses(
        (status = 201, description = "Image stored", body = ImageResponse),
        (status = 401, description = "Missing or wrong bearer token", body = ErrorResponse),
        (status = 422, description = "Not an absolute http(s) URL", body = ErrorResponse),
        (status = 500, description = "Rendering failed", body = ErrorResponse)
    )
)]
pub async fn convert_url_handler<R: Renderer>(
    State(state): State<AppState<R>>,
    ApiJson(request): ApiJson<UrlRequest>,
) -> Result<(StatusCode, Json<ImageResponse>), ConvertError> {
    let url = parse_http_url(&request.url).map_err(|e| match e {
        RenderError::InvalidUrl(reason) => ConvertError::InvalidUrl(reason),
        other => ConvertError::InvalidUrl(other.to_string()),
    })?;

    state.store.sweep(Utc::now()).await;

    let png = state
        .renderer
        .render_url(&url)
        .await
        .map_err(ConvertError::UrlRender)?;

    let metadata = state
        .store
        .create(&png, state.max_downloads, state.ttl)
        .await?;

    let image_url = state.links.download(&metadata.id, Some(state.host_images));
    Ok((StatusCode::CREATED, Json(image_response(metadata, image_url))))
}

/// Handle image downloads.
///
/// # Endpoint
///
/// `GET /download/{image_id}?host_images=<int>` (1 inline, anything else attachment)
///
/// # Response
///
/// - `200 OK`: PNG body, `Content-Disposition: inline` when `host_images=1`,
///   otherwise `attachment`
/// - `403 Forbidden`: Download quota used up
/// - `404 Not Found`: Unknown, expired or missing image
#[utoipa::path(
    get,
    path = "/download/{image_id}",
    tag = "Images",
    summary = "Download an image",
    params(
        ("image_id" = String, Path, description = "Image identifier"),
        ("host_images" = Option<i64>, Query, description = "1 serves inline, any other value as attachment")
    ),
    responses(
        (status = 200, description = "PNG image", content_type = "image/png", body = Vec<u8>),
        (status = 403, description = "Download quota used up", body = ErrorResponse),
        (status = 404, description = "Unknown or expired image", body = ErrorResponse)
    )
)]
pub async fn download_handler<R: Renderer>(
    State(state): State<AppState<R>>,
    Path(image_id): Path<String>,
    ApiQuery(query): ApiQuery<DownloadQueryParams>,
) -> Result<Response, StoreError> {
    let download = state.store.consume_download(&image_id).await?;

    let inline = query
        .host_images
        .map(|flag| flag == 1)
        .unwrap_or(state.host_images);
    let disposition = format!(
        "{}; filename=\"{}\"",
        if inline { "inline" } else { "attachment" },
        download.metadata.file_name()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        download.data,
    )
        .into_response())
}

/// Handle status requests.
///
/// # Endpoint
///
/// `GET /status/{image_id}`
///
/// # Response
///
/// - `200 OK`: [`StatusResponse`]; does not spend a download or sweep
/// - `401 Unauthorized`: Missing or wrong bearer token (from middleware)
/// - `404 Not Found`: Unknown image
#[utoipa::path(
    get,
    path = "/status/{image_id}",
    tag = "Images",
    summary = "Inspect an image",
    params(("image_id" = String, Path, description = "Image identifier")),
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Current metadata", body = StatusResponse),
        (status = 401, description = "Missing or wrong bearer token", body = ErrorResponse),
        (status = 404, description = "Unknown image", body = ErrorResponse)
    )
)]
pub async fn status_handler<R: Renderer>(
    State(state): State<AppState<R>>,
    Path(image_id): Path<String>,
) -> Result<Json<StatusResponse>, StoreError> {
    let metadata = state.store.get(&image_id).await?;
    let image_url = state.links.download(&metadata.id, None);

    Ok(Json(StatusResponse::from_metadata(metadata, image_url)))
}

/// Handle liveness probes.
///
/// `GET /` returns `{"status": "ok", "service": "HTML to Image API"}`.
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    summary = "Liveness probe",
    responses((status = 200, description = "Service is up", body = RootResponse))
)]
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        status: "ok".to_string(),
        service: "HTML to Image API".to_string(),
    })
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    summary = "Health check",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn image_response(metadata: ArtifactMetadata, image_url: String) -> ImageResponse {
    ImageResponse {
        image_url,
        image_id: metadata.id,
        downloads_remaining: metadata.downloads_remaining,
        expires_at: metadata.expires_at,
    }
}

// =============================================================================
// Tests
// =============================================================================
