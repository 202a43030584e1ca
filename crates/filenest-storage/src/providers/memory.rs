//! Blobs kept in process memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;

use filenest_core::error::AppError;
use filenest_core::result::AppResult;
use filenest_core::traits::BlobStore;

use crate::key::{key_from_url, new_key, url_for};

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    url_prefix: String,
    blobs: RwLock<HashMap<String, Bytes>>,
    /// When set, every `delete` fails with a storage error.
    fail_deletes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new(url_prefix: &str) -> Self {
        Self {
            url_prefix: url_prefix.to_string(),
            ..Self::default()
        }
    }

    /// Make subsequent deletes fail, to exercise cleanup error paths.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of blobs currently held.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn write(&self, name: &str, data: Bytes) -> AppResult<String> {
        let key = new_key(name);
        let url = url_for(&self.url_prefix, &key);
        debug!(url = %url, bytes = data.len(), "Stored blob in memory");
        self.blobs.write().await.insert(key, data);
        Ok(url)
    }

    async fn read(&self, url: &str) -> AppResult<Bytes> {
        let key = key_from_url(&self.url_prefix, url)?;
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {url}")))
    }

    async fn delete(&self, url: &str) -> AppResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::storage(format!("Failed to delete blob: {url}")));
        }
        let key = key_from_url(&self.url_prefix, url)?;
        self.blobs
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {url}")))
    }

    async fn exists(&self, url: &str) -> AppResult<bool> {
        let key = key_from_url(&self.url_prefix, url)?;
        Ok(self.blobs.read().await.contains_key(key))
    }
}
