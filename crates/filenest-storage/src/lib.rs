//! # filenest-storage
//!
//! Blob storage providers for FileNest: the local filesystem and process
//! memory. Both hand out URLs of the form `{url_prefix}/{key}`, where the key
//! is a fresh UUID followed by the sanitized original file name.

pub mod key;
pub mod providers;

use std::sync::Arc;

use filenest_core::config::{BlobProvider, StorageConfig};
use filenest_core::result::AppResult;
use filenest_core::traits::BlobStore;

pub use providers::{LocalBlobStore, MemoryBlobStore};

/// Build the blob store selected by `config.provider`.
pub async fn build_blob_store(config: &StorageConfig) -> AppResult<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.provider {
        BlobProvider::Local => Arc::new(
            LocalBlobStore::new(&config.local.root_path, &config.url_prefix).await?,
        ),
        BlobProvider::Memory => Arc::new(MemoryBlobStore::new(&config.url_prefix)),
    };
    tracing::info!(provider = store.provider_type(), "Blob store ready");
    Ok(store)
}
