//! Ephemeral artifact storage.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ArtifactStore                            │
//! │  ┌──────────────────────────┐    ┌───────────────────────────┐  │
//! │  │ Mutex<HashMap<id, meta>> │◄──►│  <storage dir>/<id>.png   │  │
//! │  └──────────────────────────┘    └───────────────────────────┘  │
//! │      create │ get │ consume_download │ sweep                    │
//! └─────────────────────────────────────────────────────────────────┘
//!                  ▲                               ▲
//!        per-request sweep (handlers)     optional Sweeper task
//! ```

pub mod artifact;
pub mod registry;
pub mod sweeper;

pub use artifact::{ArtifactMetadata, Download, ARTIFACT_EXTENSION};
pub use registry::ArtifactStore;
pub use sweeper::{Sweeper, SweeperHandle};
