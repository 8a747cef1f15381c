//! Artifact metadata and eligibility rules.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// File extension used for every stored artifact.
pub const ARTIFACT_EXTENSION: &str = "png";

/// Metadata envelope for a rendered image.
///
/// The backing bytes live on disk at `<store dir>/<id>.png`. The two halves are
/// only ever created and removed together by [`ArtifactStore`](super::ArtifactStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMetadata {
    /// Opaque UUID-style identifier, also the file stem
    pub id: String,

    /// Downloads left before the artifact is exhausted
    pub downloads_remaining: u32,

    /// Instant from which the artifact is no longer servable
    pub expires_at: DateTime<Utc>,

    /// Creation instant
    pub created_at: DateTime<Utc>,
}

impl ArtifactMetadata {
    /// True once `now` has reached `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True once the download quota is used up.
    pub fn is_exhausted(&self) -> bool {
        self.downloads_remaining == 0
    }

    /// Whether the next sweep at `now` removes this artifact.
    pub fn is_evictable(&self, now: DateTime<Utc>) -> bool {
        self.is_expired(now) || self.is_exhausted()
    }

    /// Whether a download at `now` may succeed, file presence aside.
    pub fn is_servable(&self, now: DateTime<Utc>) -> bool {
        !self.is_evictable(now)
    }

    /// File name of the backing image.
    pub fn file_name(&self) -> String {
        artifact_file_name(&self.id)
    }
}

pub(crate) fn artifact_file_name(id: &str) -> String {
    format!("{}.{}", id, ARTIFACT_EXTENSION)
}

/// Result of a successful download: the post-decrement metadata and the bytes.
#[derive(Debug, Clone)]
pub struct Download {
    pub metadata: ArtifactMetadata,
    pub data: Bytes,
}
