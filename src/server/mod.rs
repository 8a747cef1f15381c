//! HTTP server layer for Snaplink.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   POST /convert/{html,url}   GET /download/{id}   GET /status   │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌───────────┐  ┌──────────┐  │
//! │  │  handlers   │  │    auth     │  │   links   │  │  routes  │  │
//! │  │ (requests)  │  │  (bearer)   │  │ (abs URL) │  │ (router) │  │
//! │  └─────────────┘  └─────────────┘  └───────────┘  └──────────┘  │
//! │  ┌─────────────┐  ┌─────────────┐                               │
//! │  │   extract   │  │   openapi   │                               │
//! │  │ (JSON errs) │  │ (docs, UI)  │                               │
//! │  └─────────────┘  └─────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod extract;
pub mod handlers;
pub mod links;
pub mod openapi;
pub mod routes;

pub use auth::{bearer_auth_middleware, AuthError, BearerAuth};
pub use handlers::{
    convert_html_handler, convert_url_handler, download_handler, health_handler, root_handler,
    status_handler, AppState, ConvertError, DownloadQueryParams, ErrorResponse, HealthResponse,
    HtmlRequest, ImageResponse, RootResponse, StatusResponse, UrlRequest,
};
pub use extract::{ApiJson, ApiQuery, RequestRejection};
pub use links::{normalize_root_path, LinkBuilder};
pub use openapi::{api_doc, ApiDoc};
pub use routes::{create_router, RouterConfig};
