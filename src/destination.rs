//! # Destination Store
//!
//! Resolution and storage for the container that receives produced
//! artifacts.
//!
//! Resolution follows a ladder: trust the stored opaque handle first, fall
//! back to lookup-by-name, fall back to creation. `resolve_by_name` is
//! idempotent so a re-run of an already-completed job lands in the same
//! container.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{BatchError, Result};
use crate::models::{ArtifactRef, DestinationHandle};

/// Capability for resolving the destination container and storing
/// artifacts into it.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Whether the container behind a stored handle is still accessible.
    async fn container_exists(&self, handle: &DestinationHandle) -> Result<bool>;

    /// Look up a container by name, creating it if absent. Idempotent.
    async fn resolve_by_name(&self, name: &str) -> Result<DestinationHandle>;

    /// Whether an artifact with this name already exists in the container.
    async fn artifact_exists(&self, handle: &DestinationHandle, artifact_name: &str)
        -> Result<bool>;

    /// Store artifact bytes under the given name, returning a reference to
    /// the stored artifact.
    async fn store_artifact(
        &self,
        handle: &DestinationHandle,
        artifact_name: &str,
        bytes: &[u8],
    ) -> Result<ArtifactRef>;
}

/// Filesystem-backed destination: containers are directories under a root,
/// artifacts are files, handles are absolute directory paths.
#[derive(Debug, Clone)]
pub struct FsDestinationStore {
    root: PathBuf,
}

impl FsDestinationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn artifact_path(handle: &DestinationHandle, artifact_name: &str) -> PathBuf {
        PathBuf::from(handle.as_str()).join(artifact_name)
    }
}

#[async_trait]
impl DestinationStore for FsDestinationStore {
    async fn container_exists(&self, handle: &DestinationHandle) -> Result<bool> {
        match tokio::fs::metadata(handle.as_str()).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BatchError::Destination(format!(
                "failed to stat container {}: {e}",
                handle.as_str()
            ))),
        }
    }

    async fn resolve_by_name(&self, name: &str) -> Result<DestinationHandle> {
        let path = self.root.join(name);
        tokio::fs::create_dir_all(&path).await.map_err(|e| {
            BatchError::Destination(format!("failed to create container {}: {e}", path.display()))
        })?;
        Ok(DestinationHandle(path.to_string_lossy().into_owned()))
    }

    async fn artifact_exists(
        &self,
        handle: &DestinationHandle,
        artifact_name: &str,
    ) -> Result<bool> {
        let path = Self::artifact_path(handle, artifact_name);
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BatchError::Destination(format!(
                "failed to stat artifact {}: {e}",
                path.display()
            ))),
        }
    }

    async fn store_artifact(
        &self,
        handle: &DestinationHandle,
        artifact_name: &str,
        bytes: &[u8],
    ) -> Result<ArtifactRef> {
        let path = Self::artifact_path(handle, artifact_name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            BatchError::Destination(format!("failed to write artifact {}: {e}", path.display()))
        })?;
        Ok(ArtifactRef(path.to_string_lossy().into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_by_name_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDestinationStore::new(dir.path());

        let first = store.resolve_by_name("reports").await.unwrap();
        let second = store.resolve_by_name("reports").await.unwrap();
        assert_eq!(first, second);
        assert!(store.container_exists(&first).await.unwrap());
    }

    #[tokio::test]
    async fn stale_handle_reports_missing_container() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDestinationStore::new(dir.path());

        let stale = DestinationHandle(
            dir.path()
                .join("no-such-container")
                .to_string_lossy()
                .into_owned(),
        );
        assert!(!store.container_exists(&stale).await.unwrap());
    }

    #[tokio::test]
    async fn stored_artifact_becomes_visible() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDestinationStore::new(dir.path());
        let handle = store.resolve_by_name("reports").await.unwrap();

        assert!(!store.artifact_exists(&handle, "r1.pdf").await.unwrap());
        let artifact = store
            .store_artifact(&handle, "r1.pdf", b"%PDF-1.4")
            .await
            .unwrap();
        assert!(store.artifact_exists(&handle, "r1.pdf").await.unwrap());
        assert!(artifact.as_str().ends_with("r1.pdf"));
    }
}
