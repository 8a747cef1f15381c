//! `wkhtmltoimage` process wrapper.
//!
//! Invocation:
//!
//! ```text
//! wkhtmltoimage --format png --quality 85 --quiet <input> -
//! ```
//!
//! `<input>` is `-` for HTML (written to stdin) or the page URL. The image is
//! read from stdout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};
use url::Url;

use crate::error::RenderError;

use super::{Renderer, IMAGE_QUALITY};

/// Default engine binary, looked up on `PATH`.
pub const DEFAULT_RENDERER_BIN: &str = "wkhtmltoimage";

/// Default upper bound on a single render.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest stderr excerpt kept in a [`RenderError::Failed`].
const MAX_STDERR_LEN: usize = 2048;

/// Renderer backed by the `wkhtmltoimage` command-line tool.
#[derive(Debug, Clone)]
pub struct WkHtmlToImage {
    binary: String,
    timeout: Duration,
}

enum Input<'a> {
    Html(&'a str),
    Url(&'a Url),
}

impl WkHtmlToImage {
    /// Use `binary` (a name on `PATH` or a path) with the default timeout.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    /// Set the per-render timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `<binary> --version` and return its first output line.
    pub async fn version(&self) -> Result<String, RenderError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| RenderError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                code: output.status.code(),
                stderr: excerpt(&output.stderr),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    async fn run(&self, input: Input<'_>) -> Result<Bytes, RenderError> {
        let quality = IMAGE_QUALITY.to_string();

        let mut command = Command::new(&self.binary);
        command
            .args(["--format", "png", "--quality", quality.as_str(), "--quiet"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let stdin_payload = match input {
            Input::Html(html) => {
                command.arg("-").stdin(Stdio::piped());
                Some(html.as_bytes().to_vec())
            }
            Input::Url(url) => {
                command.arg(url.as_str()).stdin(Stdio::null());
                None
            }
        };
        command.arg("-");

        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;

        // Feed stdin concurrently so a chatty engine cannot fill the stdout pipe
        // while we are still writing.
        let writer = match (stdin_payload, child.stdin.take()) {
            (Some(payload), Some(mut stdin)) => Some(tokio::spawn(async move {
                let result = stdin.write_all(&payload).await;
                drop(stdin);
                result
            })),
            _ => None,
        };

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(binary = %self.binary, timeout_secs = self.timeout.as_secs(), "Render timed out");
                RenderError::Timeout {
                    seconds: self.timeout.as_secs(),
                }
            })?
            .map_err(|e| RenderError::Io(e.to_string()))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // The engine may exit before draining stdin; its status decides.
                Ok(Err(e)) => debug!("Renderer stdin closed early: {}", e),
                Err(e) => return Err(RenderError::Io(e.to_string())),
            }
        }

        if !output.status.success() {
            return Err(RenderError::Failed {
                code: output.status.code(),
                stderr: excerpt(&output.stderr),
            });
        }

        if output.stdout.is_empty() {
            return Err(RenderError::EmptyOutput);
        }

        debug!(bytes = output.stdout.len(), "Render finished");
        Ok(Bytes::from(output.stdout))
    }

    fn spawn_error(&self, e: std::io::Error) -> RenderError {
        RenderError::Spawn {
            binary: self.binary.clone(),
            message: e.to_string(),
        }
    }
}

impl Default for WkHtmlToImage {
    fn default() -> Self {
        Self::new(DEFAULT_RENDERER_BIN)
    }
}

#[async_trait]
impl Renderer for WkHtmlToImage {
    async fn render_html(&self, html: &str) -> Result<Bytes, RenderError> {
        self.run(Input::Html(html)).await
    }

    async fn render_url(&self, url: &Url) -> Result<Bytes, RenderError> {
        self.run(Input::Url(url)).await
    }
}

fn excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= MAX_STDERR_LEN {
        return text.to_string();
    }
    let mut end = MAX_STDERR_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
