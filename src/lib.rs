//! # Snaplink
//!
//! An HTTP service that renders HTML documents or web pages to PNG and hands
//! back short-lived download links.
//!
//! Each rendered image is stored on local disk and registered in memory with
//! a download quota and an expiry time. Once either runs out the image stops
//! being served, and a sweep deletes it.
//!
//! ## Features
//!
//! - **HTML and URL conversion**: Posted markup or a fetched page rendered by `wkhtmltoimage`
//! - **Bounded downloads**: Each image can be fetched a fixed number of times
//! - **Expiry**: Images disappear after a configurable number of days
//! - **Bearer authentication**: Conversion and status endpoints require a static token
//! - **Inline or attachment**: Disposition chosen per link or by server default
//!
//! ## Architecture
//!
//! - [`render`] - Renderer trait and the `wkhtmltoimage` process adapter
//! - [`store`] - Artifact registry, quota accounting and sweeping
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use snaplink::{create_router, ArtifactStore, RouterConfig, WkHtmlToImage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(ArtifactStore::open("static").await?);
//!     let config = RouterConfig::new("my-token").with_root_path("/html_to_image");
//!     let router = create_router(WkHtmlToImage::default(), store, config);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod render;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{RenderError, StoreError};
pub use render::{parse_http_url, Renderer, WkHtmlToImage};
pub use server::{
    api_doc, create_router, ApiDoc, AppState, AuthError, BearerAuth, ConvertError, ErrorResponse,
    ImageResponse, LinkBuilder, RouterConfig, StatusResponse,
};
pub use store::{ArtifactMetadata, ArtifactStore, Download, Sweeper, SweeperHandle};
