//! # Checkpoint Store
//!
//! Durable key/value persistence for the job's progress marker, surviving
//! across separate executions of the engine.
//!
//! ## Overview
//!
//! The store is injected as a capability rather than reached for as ambient
//! global state, so the executor and controller can be unit tested against
//! [`InMemoryCheckpointStore`]. [`FileCheckpointStore`] is the durable
//! implementation: a single JSON document written via temp-file-then-rename
//! so a crash mid-save never leaves a torn checkpoint behind.
//!
//! The store is deliberately not transactional: two overlapping executions
//! can race on `save`. The clear-then-arm trigger convention is the only
//! concurrency control; see the crate docs for the accepted residual risk.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;

use crate::error::{BatchError, Result};
use crate::models::Checkpoint;

/// Capability for loading and persisting the job's checkpoint.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the current checkpoint, or `None` if no job has been started.
    async fn load(&self) -> Result<Option<Checkpoint>>;

    /// Persist the checkpoint, overwriting any previous one.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()>;
}

/// Process-local store for tests and embedded use.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    slot: Mutex<Option<Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self) -> Result<Option<Checkpoint>> {
        Ok(self.slot.lock().clone())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        *self.slot.lock() = Some(checkpoint.clone());
        Ok(())
    }
}

/// Durable store backed by a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<Option<Checkpoint>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BatchError::Checkpoint(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };
        let checkpoint = serde_json::from_slice(&bytes).map_err(|e| {
            BatchError::Checkpoint(format!("corrupt checkpoint {}: {e}", self.path.display()))
        })?;
        Ok(Some(checkpoint))
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| BatchError::Checkpoint(format!("failed to encode checkpoint: {e}")))?;

        // Write-then-rename keeps the previous checkpoint intact if the
        // process dies mid-write.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            BatchError::Checkpoint(format!("failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            BatchError::Checkpoint(format!("failed to rename {}: {e}", tmp.display()))
        })?;
        Ok(())
    }
}
