//! Configuration management for Snaplink.
//!
//! Every option can be given as a command-line flag or an environment
//! variable; flags win. Defaults match a single-node deployment behind a
//! reverse proxy at `/html_to_image`.
//!
//! # Environment Variables
//!
//! - `HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 8000)
//! - `API_TOKEN` - Bearer token for conversion and status endpoints (required)
//! - `MAX_DOWNLOADS` - Downloads allowed per image (default: 5)
//! - `IMAGE_EXPIRY_DAYS` - Days before an image expires (default: 3)
//! - `BASE_URL` - Base for absolute links (default: http://localhost:8000)
//! - `ROOT_PATH` - Route prefix (default: /html_to_image)
//! - `HOST_IMAGES` - Default disposition, 1 = inline, 0 = attachment (default: 1)
//! - `STORAGE_DIR` - Directory for image files (default: static)
//! - `RENDERER_BIN` - Rendering engine binary (default: wkhtmltoimage)
//! - `RENDER_TIMEOUT` - Seconds before a render is abandoned (default: 60)
//! - `SWEEP_INTERVAL` - Background sweep period in seconds, 0 = off (default: 0)
//! - `CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use url::Url;

use crate::render::DEFAULT_RENDERER_BIN;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default number of downloads per image.
pub const DEFAULT_MAX_DOWNLOADS: u32 = 5;

/// Default image lifetime in days.
pub const DEFAULT_IMAGE_EXPIRY_DAYS: u32 = 3;

/// Default base URL for absolute links.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default route prefix.
pub const DEFAULT_ROOT_PATH: &str = "/html_to_image";

/// Default artifact directory.
pub const DEFAULT_STORAGE_DIR: &str = "static";

/// Default render timeout in seconds.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 60;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Snaplink - render HTML or URLs to PNG behind expiring download links.
#[derive(Parser, Debug, Clone)]
#[command(name = "snaplink")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Public base URL used to build absolute image links.
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "BASE_URL")]
    pub base_url: String,

    /// Prefix all routes are mounted under. Empty or "/" mounts at the root.
    #[arg(long, default_value = DEFAULT_ROOT_PATH, env = "ROOT_PATH")]
    pub root_path: String,

    // =========================================================================
    // Authentication
    // =========================================================================
    /// Static bearer token required by conversion and status endpoints.
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    // =========================================================================
    // Artifact Lifecycle
    // =========================================================================
    /// Number of downloads allowed per image.
    #[arg(long, default_value_t = DEFAULT_MAX_DOWNLOADS, env = "MAX_DOWNLOADS")]
    pub max_downloads: u32,

    /// Days until an image expires.
    #[arg(long, default_value_t = DEFAULT_IMAGE_EXPIRY_DAYS, env = "IMAGE_EXPIRY_DAYS")]
    pub image_expiry_days: u32,

    /// Serve images inline (1) rather than as attachments (0) by default.
    #[arg(
        long,
        default_value = "1",
        env = "HOST_IMAGES",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub host_images: bool,

    /// Directory where rendered images are stored.
    #[arg(long, default_value = DEFAULT_STORAGE_DIR, env = "STORAGE_DIR")]
    pub storage_dir: PathBuf,

    /// Seconds between background sweeps. 0 sweeps only on conversion requests.
    #[arg(long, default_value_t = 0, env = "SWEEP_INTERVAL")]
    pub sweep_interval: u64,

    // =========================================================================
    // Renderer
    // =========================================================================
    /// Rendering engine binary.
    #[arg(long, default_value = DEFAULT_RENDERER_BIN, env = "RENDERER_BIN")]
    pub renderer_bin: String,

    /// Seconds before a render is abandoned.
    #[arg(long, default_value_t = DEFAULT_RENDER_TIMEOUT_SECS, env = "RENDER_TIMEOUT")]
    pub render_timeout: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        match self.api_token.as_deref() {
            None | Some("") => {
                return Err(
                    "No API token provided. Set --api-token or API_TOKEN".to_string(),
                );
            }
            Some(_) => {}
        }

        if self.max_downloads == 0 {
            return Err("max_downloads must be greater than 0".to_string());
        }
        if self.image_expiry_days == 0 {
            return Err("image_expiry_days must be greater than 0".to_string());
        }
        if self.render_timeout == 0 {
            return Err("render_timeout must be greater than 0".to_string());
        }

        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(format!(
                    "base_url must be an absolute http(s) URL, got '{}'",
                    self.base_url
                ))
            }
        }

        if !self.root_path.is_empty() && !self.root_path.starts_with('/') {
            return Err(format!(
                "root_path must start with '/', got '{}'",
                self.root_path
            ));
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Image lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.image_expiry_days) * SECONDS_PER_DAY)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout)
    }

    /// Background sweep period, or `None` when only per-request sweeps run.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }

    /// Get the API token, or "" if unset (call validate() first).
    pub fn api_token_or_empty(&self) -> &str {
        self.api_token.as_deref().unwrap_or("")
    }
}

// =============================================================================
// Tests
// =============================================================================
