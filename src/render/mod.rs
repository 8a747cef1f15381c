//! Renderer adapter for the external HTML-to-image engine.
//!
//! The engine is a black box: given markup or a URL it returns PNG bytes or a
//! [`RenderError`]. Nothing here touches the artifact store.

pub mod wkhtml;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::error::RenderError;

pub use wkhtml::{WkHtmlToImage, DEFAULT_RENDERER_BIN, DEFAULT_RENDER_TIMEOUT};

/// Fixed output quality passed to the engine.
pub const IMAGE_QUALITY: u8 = 85;

/// Something that turns HTML or a web page into a PNG.
///
/// Each call runs to completion or fails once; callers get the underlying
/// cause and decide what to do with it. No retries happen at this layer.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render an HTML document.
    async fn render_html(&self, html: &str) -> Result<Bytes, RenderError>;

    /// Fetch and render the page at `url`.
    async fn render_url(&self, url: &Url) -> Result<Bytes, RenderError>;
}

/// Parse `input` as an absolute http or https URL.
pub fn parse_http_url(input: &str) -> Result<Url, RenderError> {
    let url = Url::parse(input.trim()).map_err(|e| RenderError::InvalidUrl(e.to_string()))?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err(RenderError::InvalidUrl("URL has no host".to_string())),
        scheme => Err(RenderError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            scheme
        ))),
    }
}
