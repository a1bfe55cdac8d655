//! Blob storage adapter.
//!
//! Attachment binaries live in an object store (local filesystem or S3).
//! The database stores base64url-encoded storage paths; refs are decoded
//! before use. A missing blob is the distinguished soft error: the row that
//! pointed at it is still safe to drop.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use futures::TryStreamExt;
use object_store::{ObjectStore, path::Path};
use tracing::debug;

use crate::config::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob reference: {0}")]
    InvalidRef(String),

    #[error("Storage error: {0}")]
    Store(#[from] object_store::Error),
}

/// Decode a base64url blob reference into a storage path.
pub fn decode_blob_ref(data: &str) -> Result<String, BlobError> {
    if data.is_empty() {
        return Ok(String::new());
    }
    let bytes = base64::engine::general_purpose::URL_SAFE
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(data))
        .map_err(|_| BlobError::InvalidRef(data.to_string()))?;
    String::from_utf8(bytes).map_err(|_| BlobError::InvalidRef(data.to_string()))
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Delete the given blobs. Missing blobs are skipped; any other storage
    /// error aborts so the caller can retry the whole set later.
    async fn delete_all(&self, paths: &[String]) -> Result<(), BlobError>;

    /// Delete every blob under the named container prefix.
    async fn delete_container(&self, name: &str) -> Result<(), BlobError>;
}

/// [`BlobStore`] backed by the `object_store` crate.
pub struct ObjectStoreBlobStore {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreBlobStore {
    pub fn from_config(config: &StorageConfig) -> Result<Self, BlobError> {
        let store: Arc<dyn ObjectStore> = match config {
            StorageConfig::Local { path } => {
                Arc::new(object_store::local::LocalFileSystem::new_with_prefix(path)?)
            }
            StorageConfig::S3 {
                bucket,
                region,
                endpoint,
                access_key,
                secret_key,
            } => {
                let mut builder =
                    object_store::aws::AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(region) = region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = endpoint {
                    // MinIO deployments commonly run plain HTTP
                    builder = builder.with_endpoint(endpoint).with_allow_http(true);
                }
                if let Some(access_key) = access_key {
                    builder = builder.with_access_key_id(access_key);
                }
                if let Some(secret_key) = secret_key {
                    builder = builder.with_secret_access_key(secret_key);
                }
                Arc::new(builder.build()?)
            }
        };
        Ok(Self { store })
    }

    #[cfg(test)]
    fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBlobStore {
    async fn delete_all(&self, paths: &[String]) -> Result<(), BlobError> {
        for path in paths {
            if path.is_empty() {
                continue;
            }
            match self.store.delete(&Path::from(path.as_str())).await {
                Ok(()) => {}
                Err(object_store::Error::NotFound { .. }) => {
                    debug!(path, "Blob already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn delete_container(&self, name: &str) -> Result<(), BlobError> {
        let prefix = Path::from(name);
        let objects: Vec<_> = self.store.list(Some(&prefix)).try_collect().await?;
        for object in objects {
            match self.store.delete(&object.location).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use object_store::local::LocalFileSystem;

    use super::*;

    fn local_store(dir: &tempfile::TempDir) -> (ObjectStoreBlobStore, Arc<dyn ObjectStore>) {
        let inner: Arc<dyn ObjectStore> =
            Arc::new(LocalFileSystem::new_with_prefix(dir.path()).unwrap());
        (ObjectStoreBlobStore::from_store(Arc::clone(&inner)), inner)
    }

    async fn put(store: &Arc<dyn ObjectStore>, path: &str) {
        store
            .put(&Path::from(path), object_store::PutPayload::from_static(b"blob"))
            .await
            .unwrap();
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_blob_ref("not base64!!!"), Err(BlobError::InvalidRef(_))));
    }

    #[test]
    fn decode_roundtrips_paths() {
        let encoded =
            base64::engine::general_purpose::URL_SAFE.encode("project-data/7/attachment.png");
        assert_eq!(decode_blob_ref(&encoded).unwrap(), "project-data/7/attachment.png");
        assert_eq!(decode_blob_ref("").unwrap(), "");
    }

    #[tokio::test]
    async fn delete_all_removes_existing_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let (store, inner) = local_store(&dir);
        put(&inner, "a/one.png").await;
        put(&inner, "a/two.png").await;

        store
            .delete_all(&["a/one.png".into(), "a/two.png".into()])
            .await
            .unwrap();

        assert!(inner.head(&Path::from("a/one.png")).await.is_err());
    }

    #[tokio::test]
    async fn missing_blob_is_soft_success() {
        let dir = tempfile::tempdir().unwrap();
        let (store, inner) = local_store(&dir);
        put(&inner, "a/kept.png").await;

        store
            .delete_all(&["a/missing.png".into(), "a/kept.png".into()])
            .await
            .unwrap();

        assert!(inner.head(&Path::from("a/kept.png")).await.is_err());
    }

    #[tokio::test]
    async fn delete_container_removes_prefix_only() {
        let dir = tempfile::tempdir().unwrap();
        let (store, inner) = local_store(&dir);
        put(&inner, "proj-1/a.png").await;
        put(&inner, "proj-1/b.png").await;
        put(&inner, "proj-2/c.png").await;

        store.delete_container("proj-1").await.unwrap();

        assert!(inner.head(&Path::from("proj-1/a.png")).await.is_err());
        assert!(inner.head(&Path::from("proj-2/c.png")).await.is_ok());
    }
}
