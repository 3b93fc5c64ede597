//! Filesystem blob store.
//!
//! Local implementation of the [`BlobStore`] collaborator; object keys map
//! to paths under a configured root. The engine computes keys
//! (`certificates/{universityCode}/{filename}`) and stays ignorant of where
//! the bytes land.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::infra::{BlobStore, EngineError, Result};

/// Blob store rooted at a local directory
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory from `BLOB_ROOT`, defaulting to `./data/blobs`
    pub fn from_env() -> Self {
        let root = std::env::var("BLOB_ROOT").unwrap_or_else(|_| "data/blobs".to_string());
        Self::new(root)
    }

    fn path_for(&self, object_key: &str) -> Result<PathBuf> {
        let relative = Path::new(object_key);
        // Object keys are forward-slash relative paths; anything that walks
        // upward or is absolute is rejected.
        let traversal = relative.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if object_key.is_empty() || traversal {
            return Err(EngineError::Validation {
                field: "object_key",
                message: format!("invalid object key {object_key:?}"),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, object_key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let path = self.path_for(object_key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EngineError::external("blob put", true, e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| EngineError::external("blob put", true, e.to_string()))?;

        debug!(object_key, content_type, size = bytes.len(), "stored blob");
        Ok(())
    }

    async fn get(&self, object_key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(object_key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::not_found("blob", object_key))
            }
            Err(e) => Err(EngineError::external("blob get", true, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FsBlobStore {
        let dir = std::env::temp_dir().join(format!("credentis-blob-{}", uuid::Uuid::new_v4()));
        FsBlobStore::new(dir)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = store();
        store
            .put("certificates/UNI1/degree.pdf", b"%PDF-1.7", "application/pdf")
            .await
            .unwrap();

        let bytes = store.get("certificates/UNI1/degree.pdf").await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let store = store();
        let err = store.get("certificates/UNI1/nope.pdf").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "blob", .. }));
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let store = store();
        let err = store.get("../outside").await.unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "object_key", .. }));
    }
}
