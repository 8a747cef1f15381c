//! In-memory artifact registry backed by files on disk.
//!
//! The registry owns both halves of every artifact: the metadata entry in a
//! map and the PNG file in the storage directory. All operations take one
//! mutex over the map and keep it for their file I/O, so callers never see a
//! file without metadata (or the reverse), and a sweep never races a download.
//!
//! Rendering must happen before [`ArtifactStore::create`] is called; the lock
//! is never held across the renderer.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use chrono::Utc;
//! use snaplink::store::ArtifactStore;
//!
//! let store = ArtifactStore::open("static").await?;
//!
//! let meta = store.create(&png_bytes, 5, Duration::from_secs(3 * 86400)).await?;
//! let download = store.consume_download(&meta.id).await?;
//! assert_eq!(download.metadata.downloads_remaining, 4);
//!
//! // Later, opportunistically:
//! let removed = store.sweep(Utc::now()).await;
//! ```

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreError;

use super::artifact::{artifact_file_name, ArtifactMetadata, Download};

/// Registry of live artifacts.
pub struct ArtifactStore {
    /// Directory holding `<id>.png` files
    root: PathBuf,

    /// Metadata by artifact ID
    entries: Mutex<HashMap<String, ArtifactMetadata>>,
}

impl ArtifactStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// Files already present in the directory are not adopted; metadata
    /// starts empty on every process start.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::Io(format!("{}: {}", root.display(), e)))?;

        Ok(Self {
            root,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the backing file for `id`.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(artifact_file_name(id))
    }

    /// Number of registered artifacts, including ones awaiting eviction.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no artifacts are registered.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Register `data` as a new artifact, starting its TTL now.
    pub async fn create(
        &self,
        data: &[u8],
        max_downloads: u32,
        ttl: Duration,
    ) -> Result<ArtifactMetadata, StoreError> {
        self.create_at(data, max_downloads, ttl, Utc::now()).await
    }

    /// Register `data` as a new artifact created at `now`.
    ///
    /// The file is written and the metadata inserted under the same lock; if
    /// the write fails nothing is registered and any partial file is removed.
    pub async fn create_at(
        &self,
        data: &[u8],
        max_downloads: u32,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<ArtifactMetadata, StoreError> {
        if max_downloads == 0 {
            return Err(StoreError::InvalidPolicy(
                "max_downloads must be greater than 0".to_string(),
            ));
        }
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| StoreError::InvalidPolicy(format!("ttl out of range: {:?}", ttl)))?;
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| StoreError::InvalidPolicy("ttl overflows timestamp".to_string()))?;

        let mut entries = self.entries.lock().await;

        let mut id = Uuid::new_v4().to_string();
        while entries.contains_key(&id) {
            id = Uuid::new_v4().to_string();
        }

        let path = self.path_for(&id);
        if let Err(e) = tokio::fs::write(&path, data).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(StoreError::Io(format!("{}: {}", path.display(), e)));
        }

        let metadata = ArtifactMetadata {
            id: id.clone(),
            downloads_remaining: max_downloads,
            expires_at,
            created_at: now,
        };
        entries.insert(id, metadata.clone());

        info!(
            image_id = %metadata.id,
            bytes = data.len(),
            downloads_remaining = max_downloads,
            expires_at = %metadata.expires_at,
            "Artifact created"
        );

        Ok(metadata)
    }

    /// Look up metadata without touching it.
    pub async fn get(&self, id: &str) -> Result<ArtifactMetadata, StoreError> {
        self.entries
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Serve one download of `id` now.
    pub async fn consume_download(&self, id: &str) -> Result<Download, StoreError> {
        self.consume_download_at(id, Utc::now()).await
    }

    /// Serve one download of `id`, judging expiry at `now`.
    ///
    /// Checks run in order: registered, file present, quota left, not expired.
    /// A missing file drops the orphaned metadata. On success the quota is
    /// decremented by exactly one and the file contents are returned.
    pub async fn consume_download_at(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Download, StoreError> {
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let path = self.path_for(id);
        if !file_exists(&path).await {
            entries.remove(id);
            warn!(image_id = %id, "Artifact file missing, dropping metadata");
            return Err(StoreError::NotFound(id.to_string()));
        }

        // A used-up quota wins over expiry until the entry is swept
        match entries.get(id) {
            None => return Err(StoreError::NotFound(id.to_string())),
            Some(entry) if entry.is_exhausted() => {
                return Err(StoreError::Exhausted(id.to_string()))
            }
            Some(entry) if entry.is_expired(now) => {
                return Err(StoreError::Expired(id.to_string()))
            }
            Some(_) => {}
        }

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                entries.remove(id);
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(StoreError::Io(format!("{}: {}", path.display(), e))),
        };

        let Some(entry) = entries.get_mut(id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        entry.downloads_remaining -= 1;

        debug!(
            image_id = %id,
            downloads_remaining = entry.downloads_remaining,
            "Artifact downloaded"
        );

        Ok(Download {
            metadata: entry.clone(),
            data: Bytes::from(data),
        })
    }

    /// Evict every artifact that is expired or exhausted at `now`, plus any
    /// whose backing file has disappeared.
    ///
    /// Deleting a file that is already gone is not an error. Returns the number
    /// of metadata entries removed.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;

        let mut doomed: Vec<String> = Vec::new();
        for (id, metadata) in entries.iter() {
            if metadata.is_evictable(now) || !file_exists(&self.path_for(id)).await {
                doomed.push(id.clone());
            }
        }

        for id in &doomed {
            let path = self.path_for(id);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(image_id = %id, "Failed to delete {}: {}", path.display(), e),
            }
            entries.remove(id);
        }

        if !doomed.is_empty() {
            info!(removed = doomed.len(), remaining = entries.len(), "Swept artifacts");
        }

        doomed.len()
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

// =============================================================================
// Tests
// =============================================================================
