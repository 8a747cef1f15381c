//! OpenAPI document for the Snaplink API.
//!
//! Served as JSON at `{root}/openapi.json` with Swagger UI at `{root}/docs`.

#![allow(clippy::needless_for_each)]

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::server::Server;
use utoipa::{Modify, OpenApi};

use super::handlers::{
    ErrorResponse, HealthResponse, HtmlRequest, ImageResponse, RootResponse, StatusResponse,
    UrlRequest,
};

/// Name of the bearer scheme referenced by protected paths.
pub const BEARER_SCHEME: &str = "bearer_token";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HTML to Image API",
        description = "Render HTML or web pages to PNG and serve them through download-limited, expiring links."
    ),
    tags(
        (name = "Health", description = "Liveness and health checks"),
        (name = "Conversion", description = "Render HTML or a URL to a stored PNG"),
        (name = "Images", description = "Download and inspect stored images")
    ),
    paths(
        super::handlers::root_handler,
        super::handlers::health_handler,
        super::handlers::convert_html_handler,
        super::handlers::convert_url_handler,
        super::handlers::download_handler,
        super::handlers::status_handler,
    ),
    components(schemas(
        HtmlRequest,
        UrlRequest,
        ImageResponse,
        StatusResponse,
        RootResponse,
        HealthResponse,
        ErrorResponse,
    )),
    modifiers(&BearerSecurity)
)]
pub struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// Build the document for a router mounted at `root_path` (already normalised).
///
/// Paths stay relative; a non-empty root becomes the document's server URL.
pub fn api_doc(root_path: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    if !root_path.is_empty() {
        doc.servers = Some(vec![Server::new(root_path)]);
    }
    doc
}

// =============================================================================
// Tests
// =============================================================================
