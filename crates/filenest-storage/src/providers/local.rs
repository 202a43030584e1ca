//! Blobs as files in one flat directory on the local filesystem.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use filenest_core::error::{AppError, ErrorKind};
use filenest_core::result::AppResult;
use filenest_core::traits::BlobStore;

use crate::key::{key_from_url, new_key, url_for};

/// Local filesystem blob store.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalBlobStore {
    /// Create the store, creating `root_path` if it does not exist yet.
    pub async fn new(root_path: &str, url_prefix: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create blob directory: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            url_prefix: url_prefix.to_string(),
        })
    }

    fn path_for(&self, url: &str) -> AppResult<PathBuf> {
        Ok(self.root.join(key_from_url(&self.url_prefix, url)?))
    }
}

fn io_error(action: &str, url: &str, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Blob not found: {url}"))
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to {action} blob: {url}"), e)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn write(&self, name: &str, data: Bytes) -> AppResult<String> {
        let key = new_key(name);
        let url = url_for(&self.url_prefix, &key);
        fs::write(self.root.join(&key), &data)
            .await
            .map_err(|e| io_error("write", &url, e))?;

        debug!(url = %url, bytes = data.len(), "Wrote blob");
        Ok(url)
    }

    async fn read(&self, url: &str) -> AppResult<Bytes> {
        let path = self.path_for(url)?;
        let data = fs::read(&path).await.map_err(|e| io_error("read", url, e))?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, url: &str) -> AppResult<()> {
        let path = self.path_for(url)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| io_error("delete", url, e))?;
        debug!(url, "Deleted blob");
        Ok(())
    }

    async fn exists(&self, url: &str) -> AppResult<bool> {
        let path = self.path_for(url)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| io_error("stat", url, e))
    }
}
