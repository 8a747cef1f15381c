//! Static bearer-token authentication.
//!
//! Conversion and status endpoints require:
//!
//! ```text
//! Authorization: Bearer <API_TOKEN>
//! ```
//!
//! The token is compared in constant time. Download links carry no
//! credentials; the unguessable image ID is the capability.
//!
//! The middleware runs before body extraction and before the handler, so a
//! rejected request never parses input, renders, or sweeps the store.
//!
//! # Example
//!
//! ```rust
//! use snaplink::server::auth::BearerAuth;
//!
//! let auth = BearerAuth::new("my-token");
//! assert!(auth.verify(Some("Bearer my-token")).is_ok());
//! assert!(auth.verify(Some("Bearer wrong")).is_err());
//! assert!(auth.verify(None).is_err());
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::handlers::ErrorResponse;

// =============================================================================
// Types
// =============================================================================

/// Authentication error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header
    MissingCredentials,

    /// Authorization header is not `Bearer <token>`
    InvalidScheme,

    /// Token does not match
    InvalidToken,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "Missing bearer token"),
            AuthError::InvalidScheme => write!(f, "Authorization header must use the Bearer scheme"),
            AuthError::InvalidToken => write!(f, "Invalid API token"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        let error_type = match &self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidScheme => "invalid_scheme",
            AuthError::InvalidToken => "invalid_token",
        };
        let message = self.to_string();

        // A wrong token is worth noticing; missing headers are routine
        match &self {
            AuthError::InvalidToken => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
            _ => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (
            status,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            Json(error_response),
        )
            .into_response()
    }
}

// =============================================================================
// Bearer Authentication
// =============================================================================

/// Verifies `Authorization: Bearer` headers against one static token.
#[derive(Clone)]
pub struct BearerAuth {
    token: Arc<[u8]>,
}

impl BearerAuth {
    /// Create an authenticator for `token`.
    pub fn new(token: impl AsRef<[u8]>) -> Self {
        Self {
            token: Arc::from(token.as_ref()),
        }
    }

    /// Check a raw Authorization header value.
    pub fn verify(&self, authorization: Option<&str>) -> Result<(), AuthError> {
        let value = authorization.ok_or(AuthError::MissingCredentials)?;
        let provided = bearer_token(value).ok_or(AuthError::InvalidScheme)?;

        // An empty configured token never authenticates anything
        if self.token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        if provided.as_bytes().ct_eq(&self.token[..]).into() {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

/// Extract the credentials from `Bearer <token>`, scheme matched case-insensitively.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware rejecting requests without the configured bearer token.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware, routing::post};
/// use snaplink::server::auth::{BearerAuth, bearer_auth_middleware};
///
/// let auth = BearerAuth::new("token");
/// let app = Router::new()
///     .route("/convert/html", post(convert_html_handler))
///     .route_layer(middleware::from_fn_with_state(auth, bearer_auth_middleware));
/// ```
pub async fn bearer_auth_middleware(
    State(auth): State<BearerAuth>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let authorization = match request.headers().get(header::AUTHORIZATION) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidScheme)?),
    };

    auth.verify(authorization)?;

    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
