use thiserror::Error;

/// Errors raised by the external rendering engine adapter.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The renderer binary could not be started
    #[error("Failed to start renderer '{binary}': {message}")]
    Spawn { binary: String, message: String },

    /// The renderer exited unsuccessfully
    #[error("Renderer exited with {}: {stderr}", exit_code_label(.code))]
    Failed { code: Option<i32>, stderr: String },

    /// The renderer did not finish within the configured timeout
    #[error("Renderer timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The renderer succeeded but produced no image data
    #[error("Renderer produced no output")]
    EmptyOutput,

    /// I/O error while talking to the renderer process
    #[error("Renderer I/O error: {0}")]
    Io(String),

    /// The requested URL is not an absolute http(s) URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (killed by signal)".to_string(),
    }
}

/// Errors raised by the artifact store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No artifact is registered under this ID (or its file vanished)
    #[error("Image not found or expired: {0}")]
    NotFound(String),

    /// The artifact exists but its TTL has run out
    #[error("Image expired: {0}")]
    Expired(String),

    /// The artifact exists but has no downloads left
    #[error("Maximum number of downloads reached: {0}")]
    Exhausted(String),

    /// Quota or TTL supplied to `create` cannot produce a servable artifact
    #[error("Invalid artifact policy: {0}")]
    InvalidPolicy(String),

    /// Filesystem error on the artifact directory
    #[error("Storage I/O error: {0}")]
    Io(String),
}
